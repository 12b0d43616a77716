//! The z3 backend. Terms are translated into z3 ASTs through a memo table;
//! variables are declared per formula class so that models and
//! generalizations can be projected class-wise. z3 offers no interpolants
//! and we do not route its unsat cores, so the backend advertises
//! generalization only and the engine takes its documented fallbacks.

use crate::error::VigilError;
use crate::smt::{Feature, FormulaClass, GeneralizeDirection, SmtSolver, SmtVerdict, SolverRegistration};
use crate::term::model::{Model, Value};
use crate::term::{Relocator, TermManager, TermOp, TermRef};
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use z3::ast::{Ast, BV, Bool, Dynamic, Int, Real};
use z3::{SatResult, Solver};

pub struct Z3Solver {
    solver: Solver,
    vars: BTreeMap<TermRef, FormulaClass>,
    translations: HashMap<TermRef, Dynamic>,
}

impl fmt::Debug for Z3Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Z3Solver")
            .field("vars", &self.vars.len())
            .finish()
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Z3Solver {
    pub fn new() -> Self {
        Z3Solver {
            solver: Solver::new(),
            vars: BTreeMap::new(),
            translations: HashMap::new(),
        }
    }

    fn translate(&mut self, tm: &TermManager, t: TermRef) -> Result<Dynamic, VigilError> {
        if let Some(ast) = self.translations.get(&t) {
            return Ok(ast.clone());
        }
        let ast = self.translate_uncached(tm, t)?;
        self.translations.insert(t, ast.clone());
        Ok(ast)
    }

    fn translate_bool(&mut self, tm: &TermManager, t: TermRef) -> Result<Bool, VigilError> {
        let ast = self.translate(tm, t)?;
        as_bool(&ast)
    }

    fn translate_uncached(&mut self, tm: &TermManager, t: TermRef) -> Result<Dynamic, VigilError> {
        let op = tm.op_of(t);
        match op {
            TermOp::Variable => {
                let name = tm.variable_name(t).expect("variable without a name");
                let ty = tm.type_of(t);
                Ok(match tm.op_of(ty) {
                    TermOp::TypeBool => Dynamic::from_ast(&Bool::new_const(name)),
                    TermOp::TypeInteger => Dynamic::from_ast(&Int::new_const(name)),
                    TermOp::TypeReal => Dynamic::from_ast(&Real::new_const(name)),
                    TermOp::TypeBitvector => {
                        let width = tm.bv_width_of_type(ty).expect("bit-vector type width");
                        Dynamic::from_ast(&BV::new_const(name, width))
                    }
                    _ => {
                        return Err(VigilError::Backend(format!(
                            "variable {name} has an unsupported type"
                        )));
                    }
                })
            }
            TermOp::BoolConst => Ok(Dynamic::from_ast(&Bool::from_bool(
                tm.bool_value(t).expect("bool payload"),
            ))),
            TermOp::IntegerConst => {
                let value = tm.integer_value(t).expect("integer payload");
                Ok(Dynamic::from_ast(&int_from_bigint(value)))
            }
            TermOp::RationalConst => {
                let value = tm.rational_value(t).expect("rational payload");
                Ok(Dynamic::from_ast(&real_from_rational(value)))
            }
            TermOp::BitvectorConst => {
                let (bits, width) = tm.bitvector_value(t).expect("bit-vector payload");
                Ok(Dynamic::from_ast(&bv_from_biguint(bits, width)))
            }
            TermOp::And | TermOp::Or => {
                let mut args = Vec::with_capacity(tm.size(t));
                for i in 0..tm.size(t) {
                    args.push(self.translate_bool(tm, tm.child(t, i))?);
                }
                let result = match op {
                    TermOp::And => Bool::and(&args),
                    _ => Bool::or(&args),
                };
                Ok(Dynamic::from_ast(&result))
            }
            TermOp::Not => {
                let a = self.translate_bool(tm, tm.child(t, 0))?;
                Ok(Dynamic::from_ast(&a.not()))
            }
            TermOp::Implies => {
                let a = self.translate_bool(tm, tm.child(t, 0))?;
                let b = self.translate_bool(tm, tm.child(t, 1))?;
                Ok(Dynamic::from_ast(&a.implies(&b)))
            }
            TermOp::Xor => {
                let a = self.translate_bool(tm, tm.child(t, 0))?;
                let b = self.translate_bool(tm, tm.child(t, 1))?;
                Ok(Dynamic::from_ast(&a.xor(&b)))
            }
            TermOp::Eq => {
                let a = self.translate(tm, tm.child(t, 0))?;
                let b = self.translate(tm, tm.child(t, 1))?;
                match promote_pair(&a, &b)? {
                    Promoted::Int(x, y) => Ok(Dynamic::from_ast(&x._eq(&y))),
                    Promoted::Real(x, y) => Ok(Dynamic::from_ast(&x._eq(&y))),
                    Promoted::Other => Ok(Dynamic::from_ast(&a._eq(&b))),
                }
            }
            TermOp::Ite => {
                let c = self.translate_bool(tm, tm.child(t, 0))?;
                let a = self.translate(tm, tm.child(t, 1))?;
                let b = self.translate(tm, tm.child(t, 2))?;
                match promote_pair(&a, &b)? {
                    Promoted::Int(x, y) => Ok(Dynamic::from_ast(&c.ite(&x, &y))),
                    Promoted::Real(x, y) => Ok(Dynamic::from_ast(&c.ite(&x, &y))),
                    Promoted::Other => Ok(c.ite(&a, &b)),
                }
            }
            TermOp::Leq | TermOp::Lt | TermOp::Geq | TermOp::Gt => {
                let a = self.translate(tm, tm.child(t, 0))?;
                let b = self.translate(tm, tm.child(t, 1))?;
                let result = match promote_pair(&a, &b)? {
                    Promoted::Int(x, y) => match op {
                        TermOp::Leq => x.le(&y),
                        TermOp::Lt => x.lt(&y),
                        TermOp::Geq => x.ge(&y),
                        _ => x.gt(&y),
                    },
                    Promoted::Real(x, y) => match op {
                        TermOp::Leq => x.le(&y),
                        TermOp::Lt => x.lt(&y),
                        TermOp::Geq => x.ge(&y),
                        _ => x.gt(&y),
                    },
                    Promoted::Other => {
                        return Err(VigilError::Backend(
                            "comparison over non-arithmetic terms".to_string(),
                        ));
                    }
                };
                Ok(Dynamic::from_ast(&result))
            }
            TermOp::Add | TermOp::Mul | TermOp::Sub | TermOp::Div => {
                let mut args = Vec::with_capacity(tm.size(t));
                for i in 0..tm.size(t) {
                    args.push(self.translate(tm, tm.child(t, i))?);
                }
                let any_real = op == TermOp::Div
                    || args.iter().any(|a| a.as_real().is_some());
                if any_real {
                    let mut reals = Vec::with_capacity(args.len());
                    for a in &args {
                        reals.push(as_real_promoting(a)?);
                    }
                    let mut acc = reals.remove(0);
                    for r in reals {
                        acc = match op {
                            TermOp::Add => acc + r,
                            TermOp::Mul => acc * r,
                            TermOp::Sub => acc - r,
                            _ => acc / r,
                        };
                    }
                    Ok(Dynamic::from_ast(&acc))
                } else {
                    let mut ints = Vec::with_capacity(args.len());
                    for a in &args {
                        ints.push(as_int(a)?);
                    }
                    let mut acc = ints.remove(0);
                    for i in ints {
                        acc = match op {
                            TermOp::Add => acc + i,
                            TermOp::Mul => acc * i,
                            _ => acc - i,
                        };
                    }
                    Ok(Dynamic::from_ast(&acc))
                }
            }
            TermOp::ToReal => {
                let a = self.translate(tm, tm.child(t, 0))?;
                Ok(Dynamic::from_ast(&as_real_promoting(&a)?))
            }
            TermOp::BvNot | TermOp::BvNeg => {
                let a = as_bv(&self.translate(tm, tm.child(t, 0))?)?;
                let result = match op {
                    TermOp::BvNot => a.bvnot(),
                    _ => a.bvneg(),
                };
                Ok(Dynamic::from_ast(&result))
            }
            TermOp::BvAdd | TermOp::BvSub | TermOp::BvMul | TermOp::BvUdiv | TermOp::BvUrem
            | TermOp::BvAnd | TermOp::BvOr | TermOp::BvXor | TermOp::BvShl | TermOp::BvLshr
            | TermOp::BvAshr | TermOp::BvConcat => {
                let a = as_bv(&self.translate(tm, tm.child(t, 0))?)?;
                let b = as_bv(&self.translate(tm, tm.child(t, 1))?)?;
                let result = match op {
                    TermOp::BvAdd => a.bvadd(b),
                    TermOp::BvSub => a.bvsub(b),
                    TermOp::BvMul => a.bvmul(b),
                    TermOp::BvUdiv => a.bvudiv(b),
                    TermOp::BvUrem => a.bvurem(b),
                    TermOp::BvAnd => a.bvand(b),
                    TermOp::BvOr => a.bvor(b),
                    TermOp::BvXor => a.bvxor(b),
                    TermOp::BvShl => a.bvshl(b),
                    TermOp::BvLshr => a.bvlshr(b),
                    TermOp::BvAshr => a.bvashr(b),
                    _ => a.concat(b),
                };
                Ok(Dynamic::from_ast(&result))
            }
            TermOp::BvUlt | TermOp::BvUleq | TermOp::BvUgt | TermOp::BvUgeq | TermOp::BvSlt
            | TermOp::BvSleq | TermOp::BvSgt | TermOp::BvSgeq => {
                let a = as_bv(&self.translate(tm, tm.child(t, 0))?)?;
                let b = as_bv(&self.translate(tm, tm.child(t, 1))?)?;
                let result = match op {
                    TermOp::BvUlt => a.bvult(b),
                    TermOp::BvUleq => a.bvule(b),
                    TermOp::BvUgt => a.bvugt(b),
                    TermOp::BvUgeq => a.bvuge(b),
                    TermOp::BvSlt => a.bvslt(b),
                    TermOp::BvSleq => a.bvsle(b),
                    TermOp::BvSgt => a.bvsgt(b),
                    _ => a.bvsge(b),
                };
                Ok(Dynamic::from_ast(&result))
            }
            TermOp::BvExtract => {
                let a = as_bv(&self.translate(tm, tm.child(t, 0))?)?;
                let (high, low) = tm.extract_bounds(t).expect("extract bounds");
                Ok(Dynamic::from_ast(&a.extract(high, low)))
            }
            TermOp::TypeBool | TermOp::TypeInteger | TermOp::TypeReal | TermOp::TypeBitvector => {
                Err(VigilError::Backend("cannot assert a type".to_string()))
            }
        }
    }

    fn extract_value(
        &mut self,
        tm: &TermManager,
        model: &z3::Model,
        var: TermRef,
    ) -> Result<Value, VigilError> {
        let ty = tm.type_of(var);
        let ast = self.translate(tm, var)?;
        let missing =
            || VigilError::Backend(format!("no value for {} in z3 model", tm.display(var)));
        match tm.op_of(ty) {
            TermOp::TypeBool => {
                let b = model.eval(&as_bool(&ast)?, true).ok_or_else(missing)?;
                b.as_bool()
                    .map(Value::Bool)
                    .ok_or_else(|| VigilError::Backend("non-constant boolean value".to_string()))
            }
            TermOp::TypeInteger => {
                let i = model.eval(&as_int(&ast)?, true).ok_or_else(missing)?;
                match i.as_i64() {
                    Some(v) => Ok(Value::Integer(BigInt::from(v))),
                    None => parse_model_int(&i.to_string())
                        .map(Value::Integer)
                        .ok_or_else(|| {
                            VigilError::Backend(format!("unparsable integer value `{i}`"))
                        }),
                }
            }
            TermOp::TypeReal => {
                let r = model
                    .eval(&as_real_promoting(&ast)?, true)
                    .ok_or_else(missing)?;
                match r.as_real() {
                    Some((num, den)) if den != 0 => Ok(Value::Rational(BigRational::new(
                        BigInt::from(num),
                        BigInt::from(den),
                    ))),
                    _ => parse_model_real(&r.to_string())
                        .map(Value::Rational)
                        .ok_or_else(|| {
                            VigilError::Backend(format!("unparsable rational value `{r}`"))
                        }),
                }
            }
            TermOp::TypeBitvector => {
                let width = tm.bv_width_of_type(ty).expect("bit-vector type width");
                let bv = model.eval(&as_bv(&ast)?, true).ok_or_else(missing)?;
                let bits = match bv.as_u64() {
                    Some(v) => BigUint::from(v),
                    None => parse_model_bv(&bv.to_string()).ok_or_else(|| {
                        VigilError::Backend(format!("unparsable bit-vector value `{bv}`"))
                    })?,
                };
                Ok(Value::Bitvector { bits, width })
            }
            _ => Err(VigilError::Backend("variable of unsupported type".to_string())),
        }
    }
}

impl SmtSolver for Z3Solver {
    fn name(&self) -> &str {
        "z3"
    }

    fn supports(&self, feature: Feature) -> bool {
        matches!(feature, Feature::Generalization)
    }

    fn add_variable(&mut self, var: TermRef, class: FormulaClass) {
        self.vars.entry(var).or_insert(class);
    }

    fn add(&mut self, tm: &TermManager, f: TermRef, _class: FormulaClass) -> Result<(), VigilError> {
        let ast = self.translate_bool(tm, f)?;
        self.solver.assert(ast);
        Ok(())
    }

    fn push(&mut self) {
        self.solver.push();
    }

    fn pop(&mut self) {
        self.solver.pop(1);
    }

    fn check(&mut self) -> Result<SmtVerdict, VigilError> {
        Ok(match self.solver.check() {
            SatResult::Sat => SmtVerdict::Sat,
            SatResult::Unsat => SmtVerdict::Unsat,
            SatResult::Unknown => SmtVerdict::Unknown,
        })
    }

    fn model(&mut self, tm: &TermManager) -> Result<Model, VigilError> {
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| VigilError::Backend("no model available".to_string()))?;
        let mut model = Model::new(false);
        let vars: Vec<TermRef> = self.vars.keys().copied().collect();
        for var in vars {
            let value = self.extract_value(tm, &z3_model, var)?;
            model.set(var, value);
        }
        Ok(model)
    }

    fn generalize(
        &mut self,
        tm: &mut TermManager,
        direction: GeneralizeDirection,
    ) -> Result<Vec<TermRef>, VigilError> {
        let keep = match direction {
            GeneralizeDirection::Backward => FormulaClass::A,
            GeneralizeDirection::Forward => FormulaClass::B,
        };
        let model = self.model(tm)?;
        let mut facts = Vec::new();
        for (var, class) in self.vars.iter() {
            if *class != keep {
                continue;
            }
            let Some(value) = model.value_of(*var) else {
                continue;
            };
            let fact = match value {
                Value::Bool(true) => *var,
                Value::Bool(false) => tm.mk_not(*var)?,
                Value::Integer(v) => {
                    let c = tm.mk_integer(v.clone());
                    tm.mk_term(TermOp::Eq, &[*var, c])?
                }
                Value::Rational(v) => {
                    let c = tm.mk_rational(v.clone());
                    tm.mk_term(TermOp::Eq, &[*var, c])?
                }
                Value::Bitvector { bits, width } => {
                    let c = tm.mk_bitvector(bits.clone(), *width);
                    tm.mk_term(TermOp::Eq, &[*var, c])?
                }
            };
            facts.push(fact);
        }
        Ok(facts)
    }

    fn gc(&mut self) {
        self.translations.clear();
    }

    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        roots.extend(self.vars.keys().copied());
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        let old_vars = std::mem::take(&mut self.vars);
        for (mut var, class) in old_vars {
            reloc.reloc(&mut var);
            self.vars.insert(var, class);
        }
        let old_translations = std::mem::take(&mut self.translations);
        for (t, ast) in old_translations {
            if let Some(t) = reloc.get(t) {
                self.translations.insert(t, ast);
            }
        }
    }
}

enum Promoted {
    Int(Int, Int),
    Real(Real, Real),
    Other,
}

fn promote_pair(a: &Dynamic, b: &Dynamic) -> Result<Promoted, VigilError> {
    match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => return Ok(Promoted::Int(x, y)),
        _ => {}
    }
    if a.as_real().is_some() || b.as_real().is_some() {
        return Ok(Promoted::Real(as_real_promoting(a)?, as_real_promoting(b)?));
    }
    Ok(Promoted::Other)
}

fn as_bool(ast: &Dynamic) -> Result<Bool, VigilError> {
    ast.as_bool()
        .ok_or_else(|| VigilError::Backend("boolean term expected".to_string()))
}

fn as_int(ast: &Dynamic) -> Result<Int, VigilError> {
    ast.as_int()
        .ok_or_else(|| VigilError::Backend("integer term expected".to_string()))
}

fn as_bv(ast: &Dynamic) -> Result<BV, VigilError> {
    ast.as_bv()
        .ok_or_else(|| VigilError::Backend("bit-vector term expected".to_string()))
}

fn as_real_promoting(ast: &Dynamic) -> Result<Real, VigilError> {
    if let Some(r) = ast.as_real() {
        return Ok(r);
    }
    if let Some(i) = ast.as_int() {
        return Ok(i.to_real());
    }
    Err(VigilError::Backend("arithmetic term expected".to_string()))
}

fn int_from_bigint(value: &BigInt) -> Int {
    if let Ok(v) = i64::try_from(value.clone()) {
        return Int::from_i64(v);
    }
    // Build oversized constants digit-block by digit-block.
    let negative = value < &BigInt::from(0);
    let magnitude = value.magnitude().to_str_radix(10);
    let mut acc = Int::from_i64(0);
    let digits: Vec<char> = magnitude.chars().collect();
    for block in digits.chunks(9) {
        let block_str: String = block.iter().collect();
        let width = Int::from_i64(10i64.pow(block_str.len() as u32));
        let block_value = Int::from_i64(block_str.parse::<i64>().expect("decimal block"));
        acc = acc * width + block_value;
    }
    if negative { Int::from_i64(0) - acc } else { acc }
}

fn real_from_rational(value: &BigRational) -> Real {
    let numer = int_from_bigint(value.numer());
    let denom = int_from_bigint(value.denom());
    numer.to_real() / denom.to_real()
}

fn bv_from_biguint(bits: &BigUint, width: u32) -> BV {
    if width <= 64 {
        let v = u64::try_from(bits).unwrap_or(0);
        return BV::from_u64(v, width);
    }
    // Concatenate 64-bit chunks, most significant first.
    let mask = BigUint::from(u64::MAX);
    let mut chunks = Vec::new();
    let mut rest = width;
    let mut shifted = bits.clone();
    while rest > 0 {
        let take = rest.min(64);
        let chunk = u64::try_from(&shifted & &mask).unwrap_or(0);
        chunks.push(BV::from_u64(chunk, take));
        shifted >>= 64u32;
        rest -= take;
    }
    let mut result = chunks.pop().expect("at least one chunk");
    while let Some(low) = chunks.pop() {
        result = result.concat(low);
    }
    result
}

fn parse_model_int(s: &str) -> Option<BigInt> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix("(-").and_then(|r| r.strip_suffix(')')) {
        return parse_model_int(inner).map(|v| -v);
    }
    s.parse::<BigInt>().ok()
}

fn parse_model_real(s: &str) -> Option<BigRational> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix("(-").and_then(|r| r.strip_suffix(')')) {
        return parse_model_real(inner).map(|v| -v);
    }
    if let Some(inner) = s.strip_prefix("(/").and_then(|r| r.strip_suffix(')')) {
        let mut parts = inner.trim().split_whitespace();
        let numer = parse_model_real(parts.next()?)?;
        let denom = parse_model_real(parts.next()?)?;
        if denom == BigRational::from_integer(BigInt::from(0)) {
            return None;
        }
        return Some(numer / denom);
    }
    if let Some((int_part, frac_part)) = s.split_once('.') {
        let digits: String = format!("{int_part}{frac_part}");
        let numer = digits.parse::<BigInt>().ok()?;
        let denom = BigInt::from(10).pow(frac_part.len() as u32);
        return Some(BigRational::new(numer, denom));
    }
    s.parse::<BigInt>().ok().map(BigRational::from_integer)
}

fn parse_model_bv(s: &str) -> Option<BigUint> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("#x") {
        return BigUint::parse_bytes(hex.as_bytes(), 16);
    }
    if let Some(bin) = s.strip_prefix("#b") {
        return BigUint::parse_bytes(bin.as_bytes(), 2);
    }
    s.parse::<BigUint>().ok()
}

fn construct() -> Box<dyn SmtSolver> {
    Box::new(Z3Solver::new())
}

inventory::submit! {
    SolverRegistration { id: "z3", construct }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::new_solver;

    #[test]
    fn registered_under_z3() {
        assert!(new_solver("z3").is_ok());
        assert!(new_solver("yices2").is_err());
    }

    #[test]
    fn check_and_model_round_trip() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let x = tm.mk_variable("x", ity);
        let three = tm.mk_integer_i64(3);
        let five = tm.mk_integer_i64(5);
        let lower = tm.mk_term(TermOp::Gt, &[x, three]).unwrap();
        let upper = tm.mk_term(TermOp::Lt, &[x, five]).unwrap();

        let mut solver = Z3Solver::new();
        solver.add_variable(x, FormulaClass::A);
        solver.add(&tm, lower, FormulaClass::A).unwrap();
        solver.add(&tm, upper, FormulaClass::A).unwrap();
        assert_eq!(solver.check().unwrap(), SmtVerdict::Sat);
        let model = solver.model(&tm).unwrap();
        assert_eq!(model.value_of(x), Some(&Value::Integer(BigInt::from(4))));

        solver.push();
        let not_four = {
            let four = tm.mk_integer_i64(4);
            let eq = tm.mk_term(TermOp::Eq, &[x, four]).unwrap();
            tm.mk_not(eq).unwrap()
        };
        solver.add(&tm, not_four, FormulaClass::A).unwrap();
        assert_eq!(solver.check().unwrap(), SmtVerdict::Unsat);
        solver.pop();
        assert_eq!(solver.check().unwrap(), SmtVerdict::Sat);
    }

    #[test]
    fn backward_generalization_projects_class_a() {
        let mut tm = TermManager::new();
        let bty = tm.bool_type();
        let ity = tm.integer_type();
        let x = tm.mk_variable("x", bty);
        let n = tm.mk_variable("n", ity);
        let m = tm.mk_variable("m", ity);
        let mut solver = Z3Solver::new();
        solver.add_variable(x, FormulaClass::A);
        solver.add_variable(n, FormulaClass::A);
        solver.add_variable(m, FormulaClass::B);

        let two = tm.mk_integer_i64(2);
        let n_is_two = tm.mk_term(TermOp::Eq, &[n, two]).unwrap();
        let m_gt_n = tm.mk_term(TermOp::Gt, &[m, n]).unwrap();
        solver.add(&tm, x, FormulaClass::A).unwrap();
        solver.add(&tm, n_is_two, FormulaClass::A).unwrap();
        solver.add(&tm, m_gt_n, FormulaClass::T).unwrap();
        assert_eq!(solver.check().unwrap(), SmtVerdict::Sat);

        let facts = solver
            .generalize(&mut tm, GeneralizeDirection::Backward)
            .unwrap();
        // Only the class-A variables appear.
        assert_eq!(facts.len(), 2);
        assert!(facts.contains(&x));
        assert!(facts.contains(&n_is_two));
    }

    #[test]
    fn parses_oversized_model_constants() {
        assert_eq!(parse_model_int("(- 5)"), Some(BigInt::from(-5)));
        assert_eq!(
            parse_model_int("123456789012345678901234567890"),
            "123456789012345678901234567890".parse::<BigInt>().ok()
        );
        assert_eq!(
            parse_model_real("(/ 1 3)"),
            Some(BigRational::new(BigInt::from(1), BigInt::from(3)))
        );
        assert_eq!(
            parse_model_real("2.5"),
            Some(BigRational::new(BigInt::from(5), BigInt::from(2)))
        );
        assert_eq!(parse_model_bv("#b1010"), Some(BigUint::from(10u8)));
    }
}
