//! The command layer of the input language: state types, named state and
//! transition formulas, transition systems, assumptions, and queries.
//!
//! State formulas are written over bare variable names; transition
//! formulas reference the `state.`, `input.` and `next.` copies.

pub mod sexp;

use crate::error::VigilError;
use crate::system::{StateFormula, StateType, TransitionSystem, VarClass};
use crate::term::{TermManager, TermOp, TermRef};
use num_bigint::BigInt;
use num_rational::BigRational;
use sexp::Sexp;
use std::collections::HashMap;

/// A `(query system property)` command, ready to hand to an engine.
#[derive(Debug)]
pub struct Query {
    pub system: String,
    pub property: StateFormula,
}

#[derive(Debug, Default)]
pub struct ParseContext {
    state_types: HashMap<String, StateType>,
    state_formulas: HashMap<String, StateFormula>,
    transition_formulas: HashMap<String, (String, TermRef)>,
    systems: HashMap<String, TransitionSystem>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(&self, name: &str) -> Option<&TransitionSystem> {
        self.systems.get(name)
    }

    /// Process one top-level command; `query` commands are returned to the
    /// caller for execution.
    pub fn process(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
    ) -> Result<Option<Query>, VigilError> {
        let items = sexp
            .items()
            .ok_or_else(|| sexp.error("expected a command"))?;
        let head = items
            .first()
            .and_then(Sexp::atom)
            .ok_or_else(|| sexp.error("expected a command name"))?;
        match head {
            "define-state-type" => {
                self.define_state_type(tm, sexp, &items[1..])?;
                Ok(None)
            }
            "define-states" => {
                self.define_states(tm, sexp, &items[1..])?;
                Ok(None)
            }
            "define-transition" => {
                self.define_transition(tm, sexp, &items[1..])?;
                Ok(None)
            }
            "define-transition-system" => {
                self.define_transition_system(tm, sexp, &items[1..])?;
                Ok(None)
            }
            "assume" => {
                self.assume(tm, sexp, &items[1..])?;
                Ok(None)
            }
            "query" => self.query(tm, sexp, &items[1..]).map(Some),
            other => Err(sexp.error(format!("unknown command `{other}`"))),
        }
    }

    fn define_state_type(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
        args: &[Sexp],
    ) -> Result<(), VigilError> {
        let (name, rest) = take_name(sexp, args, "define-state-type")?;
        if self.state_types.contains_key(name) {
            return Err(sexp.error(format!("state type `{name}` is already defined")));
        }
        let vars = rest
            .first()
            .ok_or_else(|| sexp.error("expected a state variable list"))?;
        let state_vars = parse_variable_list(tm, vars)?;
        let input_vars = match rest.get(1) {
            Some(inputs) => parse_variable_list(tm, inputs)?,
            None => Vec::new(),
        };
        let st = StateType::new(tm, name, &state_vars, &input_vars);
        self.state_types.insert(name.to_string(), st);
        Ok(())
    }

    fn define_states(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
        args: &[Sexp],
    ) -> Result<(), VigilError> {
        let (name, rest) = take_name(sexp, args, "define-states")?;
        if self.state_formulas.contains_key(name) {
            return Err(sexp.error(format!("state formula `{name}` is already defined")));
        }
        let (st, body) = self.state_type_and_body(sexp, rest)?;
        let scope = state_scope(st);
        let formula = parse_term(tm, body, &scope)?;
        let sf = StateFormula::new(tm, st, formula).map_err(|e| sexp.error(e.to_string()))?;
        self.state_formulas.insert(name.to_string(), sf);
        Ok(())
    }

    fn define_transition(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
        args: &[Sexp],
    ) -> Result<(), VigilError> {
        let (name, rest) = take_name(sexp, args, "define-transition")?;
        if self.transition_formulas.contains_key(name) {
            return Err(sexp.error(format!("transition formula `{name}` is already defined")));
        }
        let (st, body) = self.state_type_and_body(sexp, rest)?;
        let scope = transition_scope(st);
        let formula = parse_term(tm, body, &scope)?;
        if !st.is_transition_formula(tm, formula) {
            return Err(body.error("not a transition formula"));
        }
        let type_id = st.id().to_string();
        self.transition_formulas
            .insert(name.to_string(), (type_id, formula));
        Ok(())
    }

    fn define_transition_system(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
        args: &[Sexp],
    ) -> Result<(), VigilError> {
        let (name, rest) = take_name(sexp, args, "define-transition-system")?;
        if self.systems.contains_key(name) {
            return Err(sexp.error(format!("transition system `{name}` is already defined")));
        }
        let type_name = rest
            .first()
            .and_then(Sexp::atom)
            .ok_or_else(|| sexp.error("expected a state type name"))?;
        let st = self
            .state_types
            .get(type_name)
            .ok_or_else(|| sexp.error(format!("unknown state type `{type_name}`")))?
            .clone();

        let init_sexp = rest
            .get(1)
            .ok_or_else(|| sexp.error("expected initial states"))?;
        let initial_states = match init_sexp.atom() {
            Some(formula_name) => self
                .state_formulas
                .get(formula_name)
                .filter(|sf| sf.type_id() == st.id())
                .map(StateFormula::formula)
                .ok_or_else(|| {
                    init_sexp.error(format!("unknown state formula `{formula_name}`"))
                })?,
            None => {
                let scope = state_scope(&st);
                parse_term(tm, init_sexp, &scope)?
            }
        };

        if rest.len() < 3 {
            return Err(sexp.error("expected at least one transition"));
        }
        let mut transitions = Vec::new();
        for t in &rest[2..] {
            let formula = match t.atom() {
                Some(formula_name) => self
                    .transition_formulas
                    .get(formula_name)
                    .filter(|(type_id, _)| type_id.as_str() == st.id())
                    .map(|(_, f)| *f)
                    .ok_or_else(|| {
                        t.error(format!("unknown transition formula `{formula_name}`"))
                    })?,
                None => {
                    let scope = transition_scope(&st);
                    parse_term(tm, t, &scope)?
                }
            };
            transitions.push(formula);
        }
        let transition_relation = tm.mk_or(transitions)?;
        let ts = TransitionSystem::new(tm, st, initial_states, transition_relation)
            .map_err(|e| sexp.error(e.to_string()))?;
        self.systems.insert(name.to_string(), ts);
        Ok(())
    }

    fn assume(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
        args: &[Sexp],
    ) -> Result<(), VigilError> {
        let (name, rest) = take_name(sexp, args, "assume")?;
        let system = self
            .systems
            .get_mut(name)
            .ok_or_else(|| sexp.error(format!("unknown transition system `{name}`")))?;
        let body = rest
            .first()
            .ok_or_else(|| sexp.error("expected an assumption formula"))?;
        let scope = state_scope(system.state_type());
        let assumption = parse_term(tm, body, &scope)?;
        system
            .add_assumption(tm, assumption)
            .map_err(|e| body.error(e.to_string()))
    }

    fn query(
        &mut self,
        tm: &mut TermManager,
        sexp: &Sexp,
        args: &[Sexp],
    ) -> Result<Query, VigilError> {
        let (name, rest) = take_name(sexp, args, "query")?;
        let system = self
            .systems
            .get(name)
            .ok_or_else(|| sexp.error(format!("unknown transition system `{name}`")))?;
        let body = rest
            .first()
            .ok_or_else(|| sexp.error("expected a property formula"))?;
        let formula = match body.atom() {
            Some(formula_name) if self.state_formulas.contains_key(formula_name) => {
                self.state_formulas[formula_name].formula()
            }
            _ => {
                let scope = state_scope(system.state_type());
                parse_term(tm, body, &scope)?
            }
        };
        let property = StateFormula::new(tm, system.state_type(), formula)
            .map_err(|e| body.error(e.to_string()))?;
        Ok(Query {
            system: name.to_string(),
            property,
        })
    }

    fn state_type_and_body<'a>(
        &self,
        sexp: &Sexp,
        rest: &'a [Sexp],
    ) -> Result<(&StateType, &'a Sexp), VigilError> {
        let type_name = rest
            .first()
            .and_then(Sexp::atom)
            .ok_or_else(|| sexp.error("expected a state type name"))?;
        let st = self
            .state_types
            .get(type_name)
            .ok_or_else(|| sexp.error(format!("unknown state type `{type_name}`")))?;
        let body = rest
            .get(1)
            .ok_or_else(|| sexp.error("expected a formula"))?;
        Ok((st, body))
    }
}

fn take_name<'a>(
    sexp: &Sexp,
    args: &'a [Sexp],
    command: &str,
) -> Result<(&'a str, &'a [Sexp]), VigilError> {
    let name = args
        .first()
        .and_then(Sexp::atom)
        .ok_or_else(|| sexp.error(format!("`{command}` expects a name")))?;
    Ok((name, &args[1..]))
}

fn parse_variable_list(
    tm: &mut TermManager,
    sexp: &Sexp,
) -> Result<Vec<(String, TermRef)>, VigilError> {
    let items = sexp
        .items()
        .ok_or_else(|| sexp.error("expected a variable list"))?;
    let mut vars = Vec::with_capacity(items.len());
    for entry in items {
        let pair = entry
            .items()
            .filter(|p| p.len() == 2)
            .ok_or_else(|| entry.error("expected a `(name type)` pair"))?;
        let name = pair[0]
            .atom()
            .ok_or_else(|| pair[0].error("expected a variable name"))?;
        let ty = parse_type(tm, &pair[1])?;
        vars.push((name.to_string(), ty));
    }
    Ok(vars)
}

fn parse_type(tm: &mut TermManager, sexp: &Sexp) -> Result<TermRef, VigilError> {
    if let Some(name) = sexp.atom() {
        return match name {
            "Bool" => Ok(tm.bool_type()),
            "Int" => Ok(tm.integer_type()),
            "Real" => Ok(tm.real_type()),
            other => Err(sexp.error(format!("unknown type `{other}`"))),
        };
    }
    let items = sexp.items().filter(|i| i.len() == 3);
    if let Some(items) = items {
        if items[0].atom() == Some("_") && items[1].atom() == Some("BitVec") {
            let width: u32 = items[2]
                .atom()
                .and_then(|w| w.parse().ok())
                .ok_or_else(|| sexp.error("bad bit-vector width"))?;
            return Ok(tm.bv_type(width));
        }
    }
    Err(sexp.error("unknown type"))
}

/// Variables of a state formula: bare names and their `state.` aliases.
fn state_scope(st: &StateType) -> HashMap<String, TermRef> {
    let mut scope = HashMap::new();
    for (name, &var) in st
        .variable_names(VarClass::Current)
        .iter()
        .zip(st.variables(VarClass::Current))
    {
        scope.insert(name.clone(), var);
        scope.insert(format!("state.{name}"), var);
    }
    scope
}

/// Variables of a transition formula: the `state.`, `input.` and `next.`
/// copies.
fn transition_scope(st: &StateType) -> HashMap<String, TermRef> {
    let mut scope = HashMap::new();
    for class in [VarClass::Current, VarClass::Input, VarClass::Next] {
        for (name, &var) in st
            .variable_names(class)
            .iter()
            .zip(st.variables(class))
        {
            scope.insert(format!("{}.{name}", class.label()), var);
        }
    }
    scope
}

fn parse_term(
    tm: &mut TermManager,
    sexp: &Sexp,
    scope: &HashMap<String, TermRef>,
) -> Result<TermRef, VigilError> {
    if let Some(text) = sexp.atom() {
        return parse_atom(tm, sexp, text, scope);
    }
    let items = sexp.items().unwrap_or(&[]);
    let head = items
        .first()
        .and_then(Sexp::atom)
        .ok_or_else(|| sexp.error("expected an operator"))?;
    let mut children = Vec::with_capacity(items.len() - 1);
    for c in &items[1..] {
        children.push(parse_term(tm, c, scope)?);
    }
    let arity = |n: usize| -> Result<(), VigilError> {
        if children.len() == n {
            Ok(())
        } else {
            Err(sexp.error(format!("`{head}` expects {n} arguments")))
        }
    };
    let result = match head {
        "and" => tm.mk_term(TermOp::And, &children),
        "or" => tm.mk_term(TermOp::Or, &children),
        "not" => {
            arity(1)?;
            tm.mk_term(TermOp::Not, &children)
        }
        "=>" => {
            arity(2)?;
            tm.mk_term(TermOp::Implies, &children)
        }
        "xor" => {
            arity(2)?;
            tm.mk_term(TermOp::Xor, &children)
        }
        "=" => {
            arity(2)?;
            tm.mk_term(TermOp::Eq, &children)
        }
        "ite" => {
            arity(3)?;
            tm.mk_term(TermOp::Ite, &children)
        }
        "<=" => {
            arity(2)?;
            tm.mk_term(TermOp::Leq, &children)
        }
        "<" => {
            arity(2)?;
            tm.mk_term(TermOp::Lt, &children)
        }
        ">=" => {
            arity(2)?;
            tm.mk_term(TermOp::Geq, &children)
        }
        ">" => {
            arity(2)?;
            tm.mk_term(TermOp::Gt, &children)
        }
        "+" => tm.mk_term(TermOp::Add, &children),
        "*" => tm.mk_term(TermOp::Mul, &children),
        "-" => {
            if children.len() == 1 {
                let zero = tm.mk_integer_i64(0);
                tm.mk_term(TermOp::Sub, &[zero, children[0]])
            } else {
                arity(2)?;
                tm.mk_term(TermOp::Sub, &children)
            }
        }
        "/" => {
            arity(2)?;
            tm.mk_term(TermOp::Div, &children)
        }
        "to_real" => {
            arity(1)?;
            tm.mk_term(TermOp::ToReal, &children)
        }
        other => return Err(sexp.error(format!("unknown operator `{other}`"))),
    };
    result.map_err(|e| sexp.error(e.to_string()))
}

fn parse_atom(
    tm: &mut TermManager,
    sexp: &Sexp,
    text: &str,
    scope: &HashMap<String, TermRef>,
) -> Result<TermRef, VigilError> {
    match text {
        "true" => return Ok(tm.true_term()),
        "false" => return Ok(tm.false_term()),
        _ => {}
    }
    if let Some(&var) = scope.get(text) {
        return Ok(var);
    }
    if let Ok(value) = text.parse::<BigInt>() {
        return Ok(tm.mk_integer(value));
    }
    if let Some((int_part, frac_part)) = text.split_once('.') {
        let digits = format!("{int_part}{frac_part}");
        if let Ok(numer) = digits.parse::<BigInt>() {
            let denom = BigInt::from(10).pow(frac_part.len() as u32);
            return Ok(tm.mk_rational(BigRational::new(numer, denom)));
        }
    }
    Err(sexp.error(format!("unknown identifier `{text}`")))
}
