use crate::error::VigilError;
use crate::term::gc::{Relocator, Watermark};
use crate::term::{Payload, TermData, TermOp, TermRef};
use internment::Intern;
use itertools::Itertools;
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};
use std::hash::{DefaultHasher, Hash, Hasher};

/// A substitution, mapping variables (or arbitrary subterms) to
/// replacements.
pub type SubstMap = HashMap<TermRef, TermRef>;

#[derive(Clone, PartialEq, Eq, Hash)]
struct TermKey {
    op: TermOp,
    payload: Payload,
    children: Box<[TermRef]>,
}

/// The term manager: owner of the term arena and the hash-consing index.
///
/// Terms are immutable once created and structurally shared; two
/// construction calls with equal content return the same handle. Children
/// always precede their parents in the arena, which is what makes the
/// watermark-based collection of [`TermManager::gc`] possible.
pub struct TermManager {
    terms: Vec<TermData>,
    index: HashMap<TermKey, TermRef>,
    ty_bool: TermRef,
    ty_integer: TermRef,
    ty_real: TermRef,
    t_true: TermRef,
    t_false: TermRef,
    namespaces: Vec<String>,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TermManager {
    pub fn new() -> Self {
        let mut tm = TermManager {
            terms: Vec::new(),
            index: HashMap::new(),
            ty_bool: TermRef(0),
            ty_integer: TermRef(0),
            ty_real: TermRef(0),
            t_true: TermRef(0),
            t_false: TermRef(0),
            namespaces: Vec::new(),
        };
        tm.ty_bool = tm.intern_type(TermOp::TypeBool, Payload::None);
        tm.ty_integer = tm.intern_type(TermOp::TypeInteger, Payload::None);
        tm.ty_real = tm.intern_type(TermOp::TypeReal, Payload::None);
        tm.t_true = tm.intern(TermOp::BoolConst, Payload::Bool(true), &[], tm.ty_bool);
        tm.t_false = tm.intern(TermOp::BoolConst, Payload::Bool(false), &[], tm.ty_bool);
        tm
    }

    fn intern_type(&mut self, op: TermOp, payload: Payload) -> TermRef {
        let key = TermKey {
            op,
            payload: payload.clone(),
            children: Box::from([]),
        };
        if let Some(&t) = self.index.get(&key) {
            return t;
        }
        let t = TermRef(self.terms.len() as u32);
        self.terms.push(TermData {
            op,
            payload,
            children: Box::from([]),
            ty: t,
        });
        self.index.insert(key, t);
        t
    }

    fn intern(&mut self, op: TermOp, payload: Payload, children: &[TermRef], ty: TermRef) -> TermRef {
        let key = TermKey {
            op,
            payload: payload.clone(),
            children: Box::from(children),
        };
        if let Some(&t) = self.index.get(&key) {
            return t;
        }
        let t = TermRef(self.terms.len() as u32);
        self.terms.push(TermData {
            op,
            payload,
            children: Box::from(children),
            ty,
        });
        self.index.insert(key, t);
        t
    }

    fn data(&self, t: TermRef) -> &TermData {
        &self.terms[t.index()]
    }

    // Predefined types and constants. These are permanent: collection never
    // touches the arena prefix they live in.

    pub fn bool_type(&self) -> TermRef {
        self.ty_bool
    }

    pub fn integer_type(&self) -> TermRef {
        self.ty_integer
    }

    pub fn real_type(&self) -> TermRef {
        self.ty_real
    }

    pub fn bv_type(&mut self, width: u32) -> TermRef {
        self.intern_type(TermOp::TypeBitvector, Payload::Width(width))
    }

    pub fn true_term(&self) -> TermRef {
        self.t_true
    }

    pub fn false_term(&self) -> TermRef {
        self.t_false
    }

    // Leaf construction.

    pub fn mk_variable(&mut self, name: &str, ty: TermRef) -> TermRef {
        let payload = Payload::Name(Intern::new(name.to_string()));
        self.intern(TermOp::Variable, payload, &[ty], ty)
    }

    pub fn mk_bool(&self, value: bool) -> TermRef {
        if value { self.t_true } else { self.t_false }
    }

    pub fn mk_integer(&mut self, value: BigInt) -> TermRef {
        self.intern(
            TermOp::IntegerConst,
            Payload::Integer(value),
            &[],
            self.ty_integer,
        )
    }

    pub fn mk_integer_i64(&mut self, value: i64) -> TermRef {
        self.mk_integer(BigInt::from(value))
    }

    pub fn mk_rational(&mut self, value: BigRational) -> TermRef {
        self.intern(
            TermOp::RationalConst,
            Payload::Rational(value),
            &[],
            self.ty_real,
        )
    }

    pub fn mk_bitvector(&mut self, bits: BigUint, width: u32) -> TermRef {
        let ty = self.bv_type(width);
        self.intern(
            TermOp::BitvectorConst,
            Payload::Bitvector { bits, width },
            &[],
            ty,
        )
    }

    // Composite construction, with type checking.

    pub fn mk_term(&mut self, op: TermOp, children: &[TermRef]) -> Result<TermRef, VigilError> {
        // Light normalization keeps frames and cubes small.
        match op {
            TermOp::And | TermOp::Or if children.len() == 1 => return Ok(children[0]),
            TermOp::And if children.is_empty() => return Ok(self.t_true),
            TermOp::Or if children.is_empty() => return Ok(self.t_false),
            TermOp::Not if children.len() == 1 && self.op_of(children[0]) == TermOp::Not => {
                return Ok(self.child(children[0], 0));
            }
            _ => {}
        }
        let ty = self.check_term(op, children, None)?;
        Ok(self.intern(op, Payload::None, children, ty))
    }

    pub fn mk_bv_extract(
        &mut self,
        high: u32,
        low: u32,
        child: TermRef,
    ) -> Result<TermRef, VigilError> {
        let ty = self.check_term(TermOp::BvExtract, &[child], Some((high, low)))?;
        Ok(self.intern(TermOp::BvExtract, Payload::Extract { high, low }, &[child], ty))
    }

    pub fn mk_not(&mut self, f: TermRef) -> Result<TermRef, VigilError> {
        self.mk_term(TermOp::Not, &[f])
    }

    pub fn mk_and(&mut self, conjuncts: Vec<TermRef>) -> Result<TermRef, VigilError> {
        let conjuncts: Vec<TermRef> = conjuncts
            .into_iter()
            .filter(|&c| c != self.t_true)
            .unique()
            .collect();
        self.mk_term(TermOp::And, &conjuncts)
    }

    pub fn mk_or(&mut self, disjuncts: Vec<TermRef>) -> Result<TermRef, VigilError> {
        let disjuncts: Vec<TermRef> = disjuncts
            .into_iter()
            .filter(|&d| d != self.t_false)
            .unique()
            .collect();
        self.mk_term(TermOp::Or, &disjuncts)
    }

    fn check_term(
        &mut self,
        op: TermOp,
        children: &[TermRef],
        extract: Option<(u32, u32)>,
    ) -> Result<TermRef, VigilError> {
        let arity_error = || {
            VigilError::Type(format!(
                "operator {} applied to {} arguments",
                op.smt_name(),
                children.len()
            ))
        };
        let types: Vec<TermRef> = children.iter().map(|&c| self.type_of(c)).collect();
        let all_bool = types.iter().all(|&t| t == self.ty_bool);
        let all_arith = types
            .iter()
            .all(|&t| t == self.ty_integer || t == self.ty_real);
        let any_real = types.iter().any(|&t| t == self.ty_real);
        let same_bv_width = || {
            let w = self.bv_width_of_type(types[0])?;
            types
                .iter()
                .all(|&t| self.bv_width_of_type(t) == Some(w))
                .then_some(w)
        };
        match op {
            TermOp::And | TermOp::Or => {
                if children.len() < 2 || !all_bool {
                    return Err(arity_error());
                }
                Ok(self.ty_bool)
            }
            TermOp::Not => {
                if children.len() != 1 || !all_bool {
                    return Err(arity_error());
                }
                Ok(self.ty_bool)
            }
            TermOp::Implies | TermOp::Xor => {
                if children.len() != 2 || !all_bool {
                    return Err(arity_error());
                }
                Ok(self.ty_bool)
            }
            TermOp::Eq => {
                if children.len() != 2 {
                    return Err(arity_error());
                }
                let compatible = types[0] == types[1] || all_arith;
                if !compatible {
                    return Err(VigilError::Type("equality over distinct types".to_string()));
                }
                Ok(self.ty_bool)
            }
            TermOp::Ite => {
                if children.len() != 3 || types[0] != self.ty_bool {
                    return Err(arity_error());
                }
                if types[1] == types[2] {
                    Ok(types[1])
                } else if types[1..].iter().all(|&t| t == self.ty_integer || t == self.ty_real) {
                    Ok(self.ty_real)
                } else {
                    Err(VigilError::Type("ite branches of distinct types".to_string()))
                }
            }
            TermOp::Leq | TermOp::Lt | TermOp::Geq | TermOp::Gt => {
                if children.len() != 2 || !all_arith {
                    return Err(arity_error());
                }
                Ok(self.ty_bool)
            }
            TermOp::Add | TermOp::Mul => {
                if children.len() < 2 || !all_arith {
                    return Err(arity_error());
                }
                Ok(if any_real { self.ty_real } else { self.ty_integer })
            }
            TermOp::Sub => {
                if children.len() != 2 || !all_arith {
                    return Err(arity_error());
                }
                Ok(if any_real { self.ty_real } else { self.ty_integer })
            }
            TermOp::Div => {
                if children.len() != 2 || !all_arith {
                    return Err(arity_error());
                }
                Ok(self.ty_real)
            }
            TermOp::ToReal => {
                if children.len() != 1 || !all_arith {
                    return Err(arity_error());
                }
                Ok(self.ty_real)
            }
            TermOp::BvAdd | TermOp::BvSub | TermOp::BvMul | TermOp::BvUdiv | TermOp::BvUrem
            | TermOp::BvAnd | TermOp::BvOr | TermOp::BvXor | TermOp::BvShl | TermOp::BvLshr
            | TermOp::BvAshr => {
                if children.len() != 2 {
                    return Err(arity_error());
                }
                let w = same_bv_width()
                    .ok_or_else(|| VigilError::Type("bit-vector width mismatch".to_string()))?;
                Ok(self.bv_type(w))
            }
            TermOp::BvNot | TermOp::BvNeg => {
                if children.len() != 1 {
                    return Err(arity_error());
                }
                let w = self
                    .bv_width_of_type(types[0])
                    .ok_or_else(|| VigilError::Type("bit-vector operand expected".to_string()))?;
                Ok(self.bv_type(w))
            }
            TermOp::BvUlt | TermOp::BvUleq | TermOp::BvUgt | TermOp::BvUgeq | TermOp::BvSlt
            | TermOp::BvSleq | TermOp::BvSgt | TermOp::BvSgeq => {
                if children.len() != 2 || same_bv_width().is_none() {
                    return Err(arity_error());
                }
                Ok(self.ty_bool)
            }
            TermOp::BvConcat => {
                if children.len() != 2 {
                    return Err(arity_error());
                }
                let w0 = self.bv_width_of_type(types[0]);
                let w1 = self.bv_width_of_type(types[1]);
                match (w0, w1) {
                    (Some(a), Some(b)) => Ok(self.bv_type(a + b)),
                    _ => Err(VigilError::Type("concat of non-bit-vectors".to_string())),
                }
            }
            TermOp::BvExtract => {
                let (high, low) = extract.ok_or_else(arity_error)?;
                if children.len() != 1 {
                    return Err(arity_error());
                }
                let w = self
                    .bv_width_of_type(types[0])
                    .ok_or_else(|| VigilError::Type("extract of a non-bit-vector".to_string()))?;
                if low > high || high >= w {
                    return Err(VigilError::Type(format!(
                        "extract [{high}:{low}] out of range for width {w}"
                    )));
                }
                Ok(self.bv_type(high - low + 1))
            }
            TermOp::Variable | TermOp::BoolConst | TermOp::IntegerConst | TermOp::RationalConst
            | TermOp::BitvectorConst | TermOp::TypeBool | TermOp::TypeInteger | TermOp::TypeReal
            | TermOp::TypeBitvector => Err(VigilError::Type(format!(
                "{} is not constructed through mk_term",
                op.smt_name()
            ))),
        }
    }

    // Inspection.

    pub fn op_of(&self, t: TermRef) -> TermOp {
        self.data(t).op
    }

    pub fn size(&self, t: TermRef) -> usize {
        self.data(t).children.len()
    }

    pub fn child(&self, t: TermRef, i: usize) -> TermRef {
        self.data(t).children[i]
    }

    pub fn children(&self, t: TermRef) -> &[TermRef] {
        &self.data(t).children
    }

    pub fn type_of(&self, t: TermRef) -> TermRef {
        self.data(t).ty
    }

    pub fn id_of(&self, t: TermRef) -> u32 {
        t.id()
    }

    pub fn hash_of(&self, t: TermRef) -> u64 {
        let data = self.data(t);
        let mut hasher = DefaultHasher::new();
        data.op.hash(&mut hasher);
        data.payload.hash(&mut hasher);
        data.children.hash(&mut hasher);
        hasher.finish()
    }

    pub fn variable_name(&self, t: TermRef) -> Option<&str> {
        match &self.data(t).payload {
            Payload::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn bool_value(&self, t: TermRef) -> Option<bool> {
        match self.data(t).payload {
            Payload::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn integer_value(&self, t: TermRef) -> Option<&BigInt> {
        match &self.data(t).payload {
            Payload::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn rational_value(&self, t: TermRef) -> Option<&BigRational> {
        match &self.data(t).payload {
            Payload::Rational(v) => Some(v),
            _ => None,
        }
    }

    pub fn bitvector_value(&self, t: TermRef) -> Option<(&BigUint, u32)> {
        match &self.data(t).payload {
            Payload::Bitvector { bits, width } => Some((bits, *width)),
            _ => None,
        }
    }

    pub fn extract_bounds(&self, t: TermRef) -> Option<(u32, u32)> {
        match self.data(t).payload {
            Payload::Extract { high, low } => Some((high, low)),
            _ => None,
        }
    }

    pub fn bv_width_of_type(&self, ty: TermRef) -> Option<u32> {
        match self.data(ty).payload {
            Payload::Width(w) if self.data(ty).op == TermOp::TypeBitvector => Some(w),
            _ => None,
        }
    }

    pub fn is_variable(&self, t: TermRef) -> bool {
        self.op_of(t) == TermOp::Variable
    }

    /// Collect the free variables of `t`, deduplicated and ordered by id.
    pub fn variables_of(&self, t: TermRef, out: &mut BTreeSet<TermRef>) {
        let mut stack = vec![t];
        let mut seen = BTreeSet::new();
        while let Some(t) = stack.pop() {
            if !seen.insert(t) {
                continue;
            }
            if self.is_variable(t) {
                out.insert(t);
            } else {
                stack.extend(self.data(t).children.iter().copied());
            }
        }
    }

    /// Capture-free substitution with memoization over the shared DAG.
    pub fn substitute(&mut self, t: TermRef, map: &SubstMap) -> Result<TermRef, VigilError> {
        let mut cache = HashMap::new();
        self.substitute_rec(t, map, &mut cache)
    }

    fn substitute_rec(
        &mut self,
        t: TermRef,
        map: &SubstMap,
        cache: &mut HashMap<TermRef, TermRef>,
    ) -> Result<TermRef, VigilError> {
        if let Some(&mapped) = map.get(&t) {
            return Ok(mapped);
        }
        if let Some(&cached) = cache.get(&t) {
            return Ok(cached);
        }
        let data = self.data(t);
        let result = if data.children.is_empty() || data.op == TermOp::Variable {
            t
        } else {
            let op = data.op;
            let payload = data.payload.clone();
            let old_children: Vec<TermRef> = data.children.to_vec();
            let mut children = Vec::with_capacity(old_children.len());
            for c in &old_children {
                children.push(self.substitute_rec(*c, map, cache)?);
            }
            if children == old_children {
                t
            } else {
                match payload {
                    Payload::Extract { high, low } => self.mk_bv_extract(high, low, children[0])?,
                    _ => self.mk_term(op, &children)?,
                }
            }
        };
        cache.insert(t, result);
        Ok(result)
    }

    // Printing. Variable names are printed with any active namespace
    // prefixes stripped, so trace output shows names as the user wrote
    // them.

    pub fn push_namespace(&mut self, ns: String) {
        self.namespaces.push(ns);
    }

    pub fn pop_namespace(&mut self) {
        self.namespaces.pop();
    }

    fn display_name<'a>(&self, mut name: &'a str) -> &'a str {
        loop {
            let mut changed = false;
            for ns in &self.namespaces {
                if let Some(rest) = name.strip_prefix(ns.as_str()) {
                    name = rest;
                    changed = true;
                }
            }
            if !changed {
                return name;
            }
        }
    }

    pub fn display(&self, t: TermRef) -> TermDisplay<'_> {
        TermDisplay { tm: self, term: t }
    }

    fn fmt_term(&self, f: &mut Formatter<'_>, t: TermRef) -> fmt::Result {
        let data = self.data(t);
        match data.op {
            TermOp::TypeBool => write!(f, "Bool"),
            TermOp::TypeInteger => write!(f, "Int"),
            TermOp::TypeReal => write!(f, "Real"),
            TermOp::TypeBitvector => match data.payload {
                Payload::Width(w) => write!(f, "(_ BitVec {w})"),
                _ => unreachable!("bit-vector type without width"),
            },
            TermOp::Variable => match &data.payload {
                Payload::Name(name) => write!(f, "{}", self.display_name(name.as_str())),
                _ => unreachable!("variable without a name"),
            },
            TermOp::BoolConst => match data.payload {
                Payload::Bool(b) => write!(f, "{b}"),
                _ => unreachable!(),
            },
            TermOp::IntegerConst => match &data.payload {
                Payload::Integer(v) => write!(f, "{v}"),
                _ => unreachable!(),
            },
            TermOp::RationalConst => match &data.payload {
                Payload::Rational(v) => {
                    if v.is_integer() {
                        write!(f, "{}", v.numer())
                    } else {
                        write!(f, "{}/{}", v.numer(), v.denom())
                    }
                }
                _ => unreachable!(),
            },
            TermOp::BitvectorConst => match &data.payload {
                Payload::Bitvector { bits, width } => {
                    let digits = bits.to_str_radix(2);
                    write!(f, "#b")?;
                    for _ in digits.len()..*width as usize {
                        write!(f, "0")?;
                    }
                    write!(f, "{digits}")
                }
                _ => unreachable!(),
            },
            TermOp::BvExtract => {
                let (high, low) = self.extract_bounds(t).expect("extract without bounds");
                write!(f, "((_ extract {high} {low}) ")?;
                self.fmt_term(f, data.children[0])?;
                write!(f, ")")
            }
            op => {
                write!(f, "({}", op.smt_name())?;
                for &c in data.children.iter() {
                    write!(f, " ")?;
                    self.fmt_term(f, c)?;
                }
                write!(f, ")")
            }
        }
    }

    // Garbage collection.

    /// The current arena boundary. Terms created before a watermark are
    /// permanent with respect to collections run against it.
    pub fn mark(&self) -> Watermark {
        Watermark(self.terms.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Compact the arena above `watermark`, keeping only terms reachable
    /// from `roots` (and everything below the watermark). Returns the
    /// relocation map that every participant must apply before any further
    /// term access.
    pub fn gc(&mut self, watermark: Watermark, roots: &[TermRef]) -> Relocator {
        let wm = watermark.0 as usize;
        let len = self.terms.len();
        let mut live = vec![false; len - wm];
        let mut stack: Vec<TermRef> = roots.iter().copied().filter(|t| t.index() >= wm).collect();
        while let Some(t) = stack.pop() {
            let slot = t.index() - wm;
            if live[slot] {
                continue;
            }
            live[slot] = true;
            let data = &self.terms[t.index()];
            stack.extend(
                data.children
                    .iter()
                    .chain(std::iter::once(&data.ty))
                    .copied()
                    .filter(|c| c.index() >= wm),
            );
        }

        // Compact the suffix in place, preserving creation order.
        let mut map: Vec<Option<TermRef>> = vec![None; len - wm];
        let mut next = wm;
        for old in wm..len {
            if !live[old - wm] {
                continue;
            }
            map[old - wm] = Some(TermRef(next as u32));
            self.terms.swap(next, old);
            next += 1;
        }
        self.terms.truncate(next);

        let reloc = Relocator {
            watermark: watermark.0,
            map,
        };

        // Rewrite children and type links of the moved terms, then rebuild
        // the hash-consing index from scratch: keys embed child handles.
        for data in self.terms.iter_mut().skip(wm) {
            for c in data.children.iter_mut() {
                *c = reloc.get(*c).expect("live term with a collected child");
            }
            data.ty = reloc.get(data.ty).expect("live term with a collected type");
        }
        self.index.clear();
        for (i, data) in self.terms.iter().enumerate() {
            self.index.insert(
                TermKey {
                    op: data.op,
                    payload: data.payload.clone(),
                    children: data.children.clone(),
                },
                TermRef(i as u32),
            );
        }
        reloc
    }
}

/// Borrow-carrying display adapter: `tm.display(t)` implements `Display`
/// against the manager that owns the term.
pub struct TermDisplay<'a> {
    tm: &'a TermManager,
    term: TermRef,
}

impl Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.tm.fmt_term(f, self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermOp;

    fn bool_var(tm: &mut TermManager, name: &str) -> TermRef {
        let ty = tm.bool_type();
        tm.mk_variable(name, ty)
    }

    #[test]
    fn hash_consing_shares_structure() {
        let mut tm = TermManager::new();
        let x = bool_var(&mut tm, "x");
        let y = bool_var(&mut tm, "y");
        let a = tm.mk_term(TermOp::And, &[x, y]).unwrap();
        let b = tm.mk_term(TermOp::And, &[x, y]).unwrap();
        assert_eq!(a, b);
        let c = tm.mk_term(TermOp::And, &[y, x]).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn and_or_normalization() {
        let mut tm = TermManager::new();
        let x = bool_var(&mut tm, "x");
        assert_eq!(tm.mk_term(TermOp::And, &[x]).unwrap(), x);
        assert_eq!(tm.mk_term(TermOp::And, &[]).unwrap(), tm.true_term());
        assert_eq!(tm.mk_term(TermOp::Or, &[]).unwrap(), tm.false_term());
        let not_x = tm.mk_not(x).unwrap();
        assert_eq!(tm.mk_not(not_x).unwrap(), x);
    }

    #[test]
    fn type_checking_rejects_mixed_operands() {
        let mut tm = TermManager::new();
        let x = bool_var(&mut tm, "x");
        let ity = tm.integer_type();
        let n = tm.mk_variable("n", ity);
        assert!(tm.mk_term(TermOp::And, &[x, n]).is_err());
        assert!(tm.mk_term(TermOp::Add, &[x, n]).is_err());
        assert!(tm.mk_term(TermOp::Leq, &[n, n]).is_ok());
    }

    #[test]
    fn arithmetic_typing_promotes_to_real() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let rty = tm.real_type();
        let n = tm.mk_variable("n", ity);
        let r = tm.mk_variable("r", rty);
        let sum_ii = tm.mk_term(TermOp::Add, &[n, n]).unwrap();
        assert_eq!(tm.type_of(sum_ii), tm.integer_type());
        let sum_ir = tm.mk_term(TermOp::Add, &[n, r]).unwrap();
        assert_eq!(tm.type_of(sum_ir), tm.real_type());
        let div = tm.mk_term(TermOp::Div, &[n, n]).unwrap();
        assert_eq!(tm.type_of(div), tm.real_type());
    }

    #[test]
    fn substitution_round_trip() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let x = tm.mk_variable("x", ity);
        let x_next = tm.mk_variable("x'", ity);
        let one = tm.mk_integer_i64(1);
        let f = tm.mk_term(TermOp::Add, &[x, one]).unwrap();
        let forward: SubstMap = [(x, x_next)].into_iter().collect();
        let backward: SubstMap = [(x_next, x)].into_iter().collect();
        let f_next = tm.substitute(f, &forward).unwrap();
        assert_ne!(f, f_next);
        let f_back = tm.substitute(f_next, &backward).unwrap();
        assert_eq!(f, f_back);
    }

    #[test]
    fn namespace_stripping_in_display() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let v = tm.mk_variable("counter::state.n", ity);
        assert_eq!(format!("{}", tm.display(v)), "counter::state.n");
        tm.push_namespace("counter::".to_string());
        tm.push_namespace("state.".to_string());
        assert_eq!(format!("{}", tm.display(v)), "n");
        tm.pop_namespace();
        tm.pop_namespace();
    }

    #[test]
    fn gc_keeps_roots_and_relocates() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let x = tm.mk_variable("x", ity);
        let wm = tm.mark();
        let one = tm.mk_integer_i64(1);
        let keep = tm.mk_term(TermOp::Add, &[x, one]).unwrap();
        let drop_me = tm.mk_term(TermOp::Mul, &[x, one]).unwrap();
        let before = format!("{}", tm.display(keep));
        let reloc = tm.gc(wm, &[keep]);
        assert_eq!(reloc.get(x), Some(x));
        assert!(reloc.get(drop_me).is_none());
        let mut keep = keep;
        reloc.reloc(&mut keep);
        assert_eq!(format!("{}", tm.display(keep)), before);
        // The dropped term can be re-created and hash-consing still works.
        let again = tm.mk_term(TermOp::Mul, &[x, one]).unwrap();
        let again2 = tm.mk_term(TermOp::Mul, &[x, one]).unwrap();
        assert_eq!(again, again2);
    }

    #[test]
    fn gc_prefix_is_stable() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let x = tm.mk_variable("x", ity);
        let zero = tm.mk_integer_i64(0);
        let init = tm.mk_term(TermOp::Eq, &[x, zero]).unwrap();
        let wm = tm.mark();
        let garbage = tm.mk_term(TermOp::Lt, &[x, zero]).unwrap();
        let _ = garbage;
        let reloc = tm.gc(wm, &[]);
        // Everything below the watermark survives untouched.
        assert_eq!(reloc.get(init), Some(init));
        assert_eq!(tm.op_of(init), TermOp::Eq);
    }
}
