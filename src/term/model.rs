//! Models: assignments from variables to typed values, with structural
//! evaluation of terms under the assignment.

use crate::error::VigilError;
use crate::term::gc::Relocator;
use crate::term::{TermManager, TermOp, TermRef};
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Value {
    Bool(bool),
    Integer(BigInt),
    Rational(BigRational),
    Bitvector { bits: BigUint, width: u32 },
}

impl Value {
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    fn as_bool(&self) -> Result<bool, VigilError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(VigilError::Type("boolean value expected".to_string())),
        }
    }

    fn as_rational(&self) -> Result<BigRational, VigilError> {
        match self {
            Value::Integer(v) => Ok(BigRational::from_integer(v.clone())),
            Value::Rational(v) => Ok(v.clone()),
            _ => Err(VigilError::Type("arithmetic value expected".to_string())),
        }
    }

    fn as_bitvector(&self) -> Result<(&BigUint, u32), VigilError> {
        match self {
            Value::Bitvector { bits, width } => Ok((bits, *width)),
            _ => Err(VigilError::Type("bit-vector value expected".to_string())),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Rational(v) => {
                if v.is_integer() {
                    write!(f, "{}", v.numer())
                } else {
                    write!(f, "{}/{}", v.numer(), v.denom())
                }
            }
            Value::Bitvector { bits, width } => {
                let digits = bits.to_str_radix(2);
                write!(f, "#b")?;
                for _ in digits.len()..*width as usize {
                    write!(f, "0")?;
                }
                write!(f, "{digits}")
            }
        }
    }
}

fn pow2(width: u32) -> BigUint {
    BigUint::from(1u8) << width
}

fn bv_signed(bits: &BigUint, width: u32) -> BigInt {
    if width > 0 && bits >= &pow2(width - 1) {
        BigInt::from(bits.clone()) - BigInt::from(pow2(width))
    } else {
        BigInt::from(bits.clone())
    }
}

/// A map from variables to values. With `undef_to_default` set, unbound
/// variables evaluate to the default value of their type instead of
/// failing; the trace model is built this way.
#[derive(Clone, Debug, Default)]
pub struct Model {
    values: BTreeMap<TermRef, Value>,
    undef_to_default: bool,
}

impl Model {
    pub fn new(undef_to_default: bool) -> Self {
        Model {
            values: BTreeMap::new(),
            undef_to_default,
        }
    }

    pub fn set(&mut self, var: TermRef, value: Value) {
        self.values.insert(var, value);
    }

    pub fn value_of(&self, var: TermRef) -> Option<&Value> {
        self.values.get(&var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermRef, &Value)> {
        self.values.iter().map(|(&k, v)| (k, v))
    }

    /// Absorb all bindings of another model.
    pub fn absorb(&mut self, other: &Model) {
        for (var, value) in other.iter() {
            self.values.insert(var, value.clone());
        }
    }

    pub fn is_true(&self, tm: &TermManager, f: TermRef) -> Result<bool, VigilError> {
        Ok(self.eval(tm, f)?.is_true())
    }

    pub fn is_false(&self, tm: &TermManager, f: TermRef) -> Result<bool, VigilError> {
        Ok(self.eval(tm, f)?.is_false())
    }

    pub fn eval(&self, tm: &TermManager, t: TermRef) -> Result<Value, VigilError> {
        let mut cache = HashMap::new();
        self.eval_rec(tm, t, &mut cache)
    }

    fn default_value(&self, tm: &TermManager, var: TermRef) -> Result<Value, VigilError> {
        if !self.undef_to_default {
            return Err(VigilError::Backend(format!(
                "no model value for variable {}",
                tm.display(var)
            )));
        }
        let ty = tm.type_of(var);
        Ok(match tm.op_of(ty) {
            TermOp::TypeBool => Value::Bool(false),
            TermOp::TypeInteger => Value::Integer(BigInt::from(0)),
            TermOp::TypeReal => Value::Rational(BigRational::from_integer(BigInt::from(0))),
            TermOp::TypeBitvector => Value::Bitvector {
                bits: BigUint::from(0u8),
                width: tm.bv_width_of_type(ty).unwrap_or(1),
            },
            _ => return Err(VigilError::Type("variable of unknown type".to_string())),
        })
    }

    fn eval_rec(
        &self,
        tm: &TermManager,
        t: TermRef,
        cache: &mut HashMap<TermRef, Value>,
    ) -> Result<Value, VigilError> {
        if let Some(v) = cache.get(&t) {
            return Ok(v.clone());
        }
        let value = self.eval_uncached(tm, t, cache)?;
        cache.insert(t, value.clone());
        Ok(value)
    }

    fn eval_uncached(
        &self,
        tm: &TermManager,
        t: TermRef,
        cache: &mut HashMap<TermRef, Value>,
    ) -> Result<Value, VigilError> {
        let op = tm.op_of(t);
        match op {
            TermOp::Variable => match self.values.get(&t) {
                Some(v) => Ok(v.clone()),
                None => self.default_value(tm, t),
            },
            TermOp::BoolConst => Ok(Value::Bool(tm.bool_value(t).expect("bool payload"))),
            TermOp::IntegerConst => Ok(Value::Integer(
                tm.integer_value(t).expect("integer payload").clone(),
            )),
            TermOp::RationalConst => Ok(Value::Rational(
                tm.rational_value(t).expect("rational payload").clone(),
            )),
            TermOp::BitvectorConst => {
                let (bits, width) = tm.bitvector_value(t).expect("bit-vector payload");
                Ok(Value::Bitvector {
                    bits: bits.clone(),
                    width,
                })
            }
            TermOp::And => {
                let mut result = true;
                for i in 0..tm.size(t) {
                    result &= self.eval_rec(tm, tm.child(t, i), cache)?.as_bool()?;
                }
                Ok(Value::Bool(result))
            }
            TermOp::Or => {
                let mut result = false;
                for i in 0..tm.size(t) {
                    result |= self.eval_rec(tm, tm.child(t, i), cache)?.as_bool()?;
                }
                Ok(Value::Bool(result))
            }
            TermOp::Not => {
                let v = self.eval_rec(tm, tm.child(t, 0), cache)?.as_bool()?;
                Ok(Value::Bool(!v))
            }
            TermOp::Implies => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?.as_bool()?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?.as_bool()?;
                Ok(Value::Bool(!a || b))
            }
            TermOp::Xor => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?.as_bool()?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?.as_bool()?;
                Ok(Value::Bool(a ^ b))
            }
            TermOp::Eq => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?;
                let eq = match (&a, &b) {
                    (Value::Bool(x), Value::Bool(y)) => x == y,
                    (Value::Bitvector { .. }, Value::Bitvector { .. }) => a == b,
                    _ => a.as_rational()? == b.as_rational()?,
                };
                Ok(Value::Bool(eq))
            }
            TermOp::Ite => {
                let c = self.eval_rec(tm, tm.child(t, 0), cache)?.as_bool()?;
                let branch = if c { tm.child(t, 1) } else { tm.child(t, 2) };
                self.eval_rec(tm, branch, cache)
            }
            TermOp::Leq | TermOp::Lt | TermOp::Geq | TermOp::Gt => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?.as_rational()?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?.as_rational()?;
                Ok(Value::Bool(match op {
                    TermOp::Leq => a <= b,
                    TermOp::Lt => a < b,
                    TermOp::Geq => a >= b,
                    _ => a > b,
                }))
            }
            TermOp::Add | TermOp::Mul => {
                let mut values = Vec::with_capacity(tm.size(t));
                for i in 0..tm.size(t) {
                    values.push(self.eval_rec(tm, tm.child(t, i), cache)?);
                }
                if values.iter().all(|v| matches!(v, Value::Integer(_))) {
                    let mut acc = match op {
                        TermOp::Add => BigInt::from(0),
                        _ => BigInt::from(1),
                    };
                    for v in values {
                        let Value::Integer(v) = v else { unreachable!() };
                        acc = match op {
                            TermOp::Add => acc + v,
                            _ => acc * v,
                        };
                    }
                    Ok(Value::Integer(acc))
                } else {
                    let mut acc = match op {
                        TermOp::Add => BigRational::from_integer(BigInt::from(0)),
                        _ => BigRational::from_integer(BigInt::from(1)),
                    };
                    for v in values {
                        let v = v.as_rational()?;
                        acc = match op {
                            TermOp::Add => acc + v,
                            _ => acc * v,
                        };
                    }
                    Ok(Value::Rational(acc))
                }
            }
            TermOp::Sub => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?;
                match (&a, &b) {
                    (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x - y)),
                    _ => Ok(Value::Rational(a.as_rational()? - b.as_rational()?)),
                }
            }
            TermOp::Div => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?.as_rational()?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?.as_rational()?;
                if b == BigRational::from_integer(BigInt::from(0)) {
                    return Err(VigilError::Type(
                        "division by zero in model evaluation".to_string(),
                    ));
                }
                Ok(Value::Rational(a / b))
            }
            TermOp::ToReal => {
                let v = self.eval_rec(tm, tm.child(t, 0), cache)?.as_rational()?;
                Ok(Value::Rational(v))
            }
            TermOp::BvNot | TermOp::BvNeg => {
                let v = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let (bits, width) = v.as_bitvector()?;
                let modulus = pow2(width);
                let bits = match op {
                    TermOp::BvNot => (modulus - BigUint::from(1u8)) - bits,
                    _ => (modulus.clone() - bits) % modulus,
                };
                Ok(Value::Bitvector { bits, width })
            }
            TermOp::BvAdd | TermOp::BvSub | TermOp::BvMul | TermOp::BvUdiv | TermOp::BvUrem
            | TermOp::BvAnd | TermOp::BvOr | TermOp::BvXor | TermOp::BvShl | TermOp::BvLshr
            | TermOp::BvAshr | TermOp::BvConcat => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?;
                let (x, w) = a.as_bitvector()?;
                let (y, wy) = b.as_bitvector()?;
                let modulus = pow2(w);
                let all_ones = modulus.clone() - BigUint::from(1u8);
                let shift = |bits: &BigUint| u64::try_from(bits).unwrap_or(u64::MAX).min(w as u64);
                let (bits, width) = match op {
                    TermOp::BvAdd => ((x + y) % &modulus, w),
                    TermOp::BvSub => ((x + (modulus.clone() - y)) % &modulus, w),
                    TermOp::BvMul => ((x * y) % &modulus, w),
                    TermOp::BvUdiv => {
                        if y == &BigUint::from(0u8) {
                            (all_ones, w)
                        } else {
                            (x / y, w)
                        }
                    }
                    TermOp::BvUrem => {
                        if y == &BigUint::from(0u8) {
                            (x.clone(), w)
                        } else {
                            (x % y, w)
                        }
                    }
                    TermOp::BvAnd => (x & y, w),
                    TermOp::BvOr => (x | y, w),
                    TermOp::BvXor => (x ^ y, w),
                    TermOp::BvShl => ((x << shift(y)) % &modulus, w),
                    TermOp::BvLshr => (x >> shift(y), w),
                    TermOp::BvAshr => {
                        let amount = shift(y);
                        let mut bits = x >> amount;
                        if bv_signed(x, w) < BigInt::from(0) {
                            // Shift in ones from the top.
                            let ones = (pow2(amount.min(w as u64) as u32)
                                - BigUint::from(1u8))
                                << (w as u64 - amount);
                            bits |= ones;
                        }
                        (bits, w)
                    }
                    _ => ((x << wy) | y, w + wy),
                };
                Ok(Value::Bitvector { bits, width })
            }
            TermOp::BvUlt | TermOp::BvUleq | TermOp::BvUgt | TermOp::BvUgeq => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?;
                let (x, _) = a.as_bitvector()?;
                let (y, _) = b.as_bitvector()?;
                Ok(Value::Bool(match op {
                    TermOp::BvUlt => x < y,
                    TermOp::BvUleq => x <= y,
                    TermOp::BvUgt => x > y,
                    _ => x >= y,
                }))
            }
            TermOp::BvSlt | TermOp::BvSleq | TermOp::BvSgt | TermOp::BvSgeq => {
                let a = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let b = self.eval_rec(tm, tm.child(t, 1), cache)?;
                let (x, w) = a.as_bitvector()?;
                let (y, wy) = b.as_bitvector()?;
                let (x, y) = (bv_signed(x, w), bv_signed(y, wy));
                Ok(Value::Bool(match op {
                    TermOp::BvSlt => x < y,
                    TermOp::BvSleq => x <= y,
                    TermOp::BvSgt => x > y,
                    _ => x >= y,
                }))
            }
            TermOp::BvExtract => {
                let v = self.eval_rec(tm, tm.child(t, 0), cache)?;
                let (bits, _) = v.as_bitvector()?;
                let (high, low) = tm.extract_bounds(t).expect("extract bounds");
                let width = high - low + 1;
                let mask = pow2(width) - BigUint::from(1u8);
                Ok(Value::Bitvector {
                    bits: (bits >> low) & mask,
                    width,
                })
            }
            TermOp::TypeBool | TermOp::TypeInteger | TermOp::TypeReal | TermOp::TypeBitvector => {
                Err(VigilError::Type("cannot evaluate a type".to_string()))
            }
        }
    }

    pub fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        roots.extend(self.values.keys().copied());
    }

    pub fn gc_relocate(&mut self, reloc: &Relocator) {
        let old = std::mem::take(&mut self.values);
        for (var, value) in old {
            if let Some(var) = reloc.get(var) {
                self.values.insert(var, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermManager;

    #[test]
    fn evaluates_boolean_structure() {
        let mut tm = TermManager::new();
        let bty = tm.bool_type();
        let x = tm.mk_variable("x", bty);
        let y = tm.mk_variable("y", bty);
        let mut m = Model::new(false);
        m.set(x, Value::Bool(true));
        m.set(y, Value::Bool(false));
        let or = tm.mk_term(TermOp::Or, &[x, y]).unwrap();
        let and = tm.mk_term(TermOp::And, &[x, y]).unwrap();
        let imp = tm.mk_term(TermOp::Implies, &[y, x]).unwrap();
        assert!(m.is_true(&tm, or).unwrap());
        assert!(m.is_false(&tm, and).unwrap());
        assert!(m.is_true(&tm, imp).unwrap());
    }

    #[test]
    fn evaluates_arithmetic_with_promotion() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let n = tm.mk_variable("n", ity);
        let mut m = Model::new(false);
        m.set(n, Value::Integer(BigInt::from(3)));
        let two = tm.mk_integer_i64(2);
        let sum = tm.mk_term(TermOp::Add, &[n, two]).unwrap();
        assert_eq!(m.eval(&tm, sum).unwrap(), Value::Integer(BigInt::from(5)));
        let div = tm.mk_term(TermOp::Div, &[n, two]).unwrap();
        assert_eq!(
            m.eval(&tm, div).unwrap(),
            Value::Rational(BigRational::new(BigInt::from(3), BigInt::from(2)))
        );
        let le = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        assert!(m.is_false(&tm, le).unwrap());
    }

    #[test]
    fn defaults_apply_only_when_enabled() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let n = tm.mk_variable("n", ity);
        let strict = Model::new(false);
        assert!(strict.eval(&tm, n).is_err());
        let defaulting = Model::new(true);
        assert_eq!(
            defaulting.eval(&tm, n).unwrap(),
            Value::Integer(BigInt::from(0))
        );
    }

    #[test]
    fn evaluates_bitvector_arithmetic() {
        let mut tm = TermManager::new();
        let a = tm.mk_bitvector(BigUint::from(0b1010u8), 4);
        let b = tm.mk_bitvector(BigUint::from(0b0110u8), 4);
        let m = Model::new(false);
        let add = tm.mk_term(TermOp::BvAdd, &[a, b]).unwrap();
        assert_eq!(
            m.eval(&tm, add).unwrap(),
            Value::Bitvector {
                bits: BigUint::from(0u8),
                width: 4
            }
        );
        let ult = tm.mk_term(TermOp::BvUlt, &[b, a]).unwrap();
        assert!(m.is_true(&tm, ult).unwrap());
        let slt = tm.mk_term(TermOp::BvSlt, &[a, b]).unwrap();
        assert!(m.is_true(&tm, slt).unwrap());
    }
}
