//! Unary, binary and compound-assignment operators.

use kava_ast::{BinaryOp, Node, UnaryOp};
use kava_core::{Primitive, Type, Value, relations};

use super::{ARITHMETIC, Frame, Interpreter, Operand, fail, type_list};
use crate::environment::Environment;
use crate::error::{EvalResult, EvaluationErrorKind};

fn undefined<T>(op: impl ToString, operands: &[Type], node: &Node) -> EvalResult<T> {
    fail(
        EvaluationErrorKind::UndefinedOperator {
            op: op.to_string(),
            operands: type_list(operands),
        },
        node,
    )
}

/// Integral arithmetic in `int` or `long` width. `None` on division by zero.
fn integral_op(op: BinaryOp, x: i64, y: i64, long: bool) -> Option<i64> {
    if long {
        return Some(match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div if y != 0 => x.wrapping_div(y),
            BinaryOp::Rem if y != 0 => x.wrapping_rem(y),
            BinaryOp::BitAnd => x & y,
            BinaryOp::BitOr => x | y,
            BinaryOp::BitXor => x ^ y,
            BinaryOp::Shl => x.wrapping_shl((y & 63) as u32),
            BinaryOp::Shr => x >> (y & 63),
            BinaryOp::UShr => ((x as u64) >> (y & 63)) as i64,
            _ => return None,
        });
    }
    let (x, y) = (x as i32, y as i32);
    let v = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div if y != 0 => x.wrapping_div(y),
        BinaryOp::Rem if y != 0 => x.wrapping_rem(y),
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::Shl => x.wrapping_shl((y & 31) as u32),
        BinaryOp::Shr => x >> (y & 31),
        BinaryOp::UShr => ((x as u32) >> (y & 31)) as i32,
        _ => return None,
    };
    Some(i64::from(v))
}

/// IEEE arithmetic. Results for `float` are computed in double precision
/// and rounded once, which is exact for these operators.
fn floating_op(op: BinaryOp, x: f64, y: f64) -> Option<f64> {
    Some(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Rem => x % y,
        _ => return None,
    })
}

fn compare(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (_, None) => false,
        (BinaryOp::Lt, Some(o)) => o == Less,
        (BinaryOp::Le, Some(o)) => o != Greater,
        (BinaryOp::Gt, Some(o)) => o == Greater,
        (BinaryOp::Ge, Some(o)) => o != Less,
        _ => false,
    }
}

impl Interpreter<'_> {
    /// Result type of `left op right`.
    pub(super) fn binary_type(&self, op: BinaryOp, left: &Type, right: &Type, node: &Node) -> EvalResult<Type> {
        let operands = [left.clone(), right.clone()];
        if left.is_void() || right.is_void() {
            return undefined(op, &operands, node);
        }
        let numeric = left.numeric().zip(right.numeric());
        let boolean = left.unboxed() == Some(Primitive::Boolean) && right.unboxed() == Some(Primitive::Boolean);
        let ty = match op {
            BinaryOp::Add if left.is_string() || right.is_string() => Some(Type::string()),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                numeric.map(|(l, r)| Type::primitive(Primitive::promote_binary(l, r)))
            }
            op if op.is_shift() => match (left.integral(), right.integral()) {
                (Some(l), Some(_)) => Some(Type::primitive(l.promote())),
                _ => None,
            },
            op if op.is_bitwise() => {
                if boolean {
                    Some(Type::boolean())
                } else {
                    match (left.integral(), right.integral()) {
                        (Some(l), Some(r)) => Some(Type::primitive(Primitive::promote_binary(l, r))),
                        _ => None,
                    }
                }
            }
            BinaryOp::And | BinaryOp::Or => boolean.then(Type::boolean),
            op if op.is_comparison() => numeric.map(|_| Type::boolean()),
            BinaryOp::Eq | BinaryOp::Ne => {
                let references = left.is_reference() && right.is_reference() && self.castable(left, right);
                (numeric.is_some() || boolean || references).then(Type::boolean)
            }
            _ => None,
        };
        match ty {
            Some(ty) => Ok(ty),
            None => undefined(op, &operands, node),
        }
    }

    pub(super) fn binary(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        op: BinaryOp,
        left: &Node,
        right: &Node,
    ) -> EvalResult<Operand> {
        let lhs = self.operand(env, frame, left)?;
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let decided = match &lhs.value {
                Some(value) if lhs.ty.unboxed() == Some(Primitive::Boolean) => match value.as_bool() {
                    Some(b) => (b == (op == BinaryOp::Or)).then_some(b),
                    None => return self.null_pointer(left),
                },
                _ => None,
            };
            if let Some(result) = decided {
                let mut check = env.snapshot();
                let rhs = self.operand(check.as_mut(), &frame.typed(), right)?;
                let ty = self.binary_type(op, &lhs.ty, &rhs.ty, node)?;
                return Ok(Operand::new(ty, Some(Value::Boolean(result))));
            }
        }
        let rhs = self.operand(env, frame, right)?;
        let ty = self.binary_type(op, &lhs.ty, &rhs.ty, node)?;
        let value = match (lhs.value, rhs.value) {
            (Some(l), Some(r)) => Some(self.apply(op, &lhs.ty, &rhs.ty, &ty, l, r, node)?),
            _ => None,
        };
        Ok(Operand::new(ty, value))
    }

    /// Compute `l op r` for operands already typed by [`Self::binary_type`].
    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        op: BinaryOp,
        left: &Type,
        right: &Type,
        result: &Type,
        l: Value,
        r: Value,
        node: &Node,
    ) -> EvalResult<Value> {
        if result.is_string() {
            let text = format!("{}{}", self.display(&l)?, self.display(&r)?);
            return Ok(Value::string(text));
        }
        match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                let unboxes = left.is_primitive() || right.is_primitive();
                if unboxes && (l.is_null() || r.is_null()) {
                    return self.null_pointer(node);
                }
                let equal = match (left.numeric(), right.numeric()) {
                    (Some(a), Some(b)) if unboxes => {
                        let p = Primitive::promote_binary(a, b);
                        match (l.convert(p), r.convert(p)) {
                            (Some(x), Some(y)) => x.identical(&y),
                            _ => return self.null_pointer(node),
                        }
                    }
                    _ => l.identical(&r),
                };
                Ok(Value::Boolean(equal == (op == BinaryOp::Eq)))
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
                if result.is_boolean() =>
            {
                let (Some(a), Some(b)) = (l.as_bool(), r.as_bool()) else {
                    return self.null_pointer(node);
                };
                Ok(Value::Boolean(match op {
                    BinaryOp::And | BinaryOp::BitAnd => a && b,
                    BinaryOp::Or | BinaryOp::BitOr => a || b,
                    _ => a != b,
                }))
            }
            op if op.is_comparison() => {
                let (Some(a), Some(b)) = (left.numeric(), right.numeric()) else {
                    return undefined(op, &[left.clone(), right.clone()], node);
                };
                let p = Primitive::promote_binary(a, b);
                let (Some(x), Some(y)) = (l.convert(p), r.convert(p)) else {
                    return self.null_pointer(node);
                };
                let ordering = if p.is_floating() {
                    x.as_f64().zip(y.as_f64()).and_then(|(x, y)| x.partial_cmp(&y))
                } else {
                    x.as_i64().zip(y.as_i64()).map(|(x, y)| x.cmp(&y))
                };
                Ok(Value::Boolean(compare(op, ordering)))
            }
            _ => {
                let Some(p) = result.as_primitive() else {
                    return undefined(op, &[left.clone(), right.clone()], node);
                };
                // Shift distances keep their own type.
                let distance = if op.is_shift() { right.integral() } else { Some(p) };
                let (Some(x), Some(y)) = (l.convert(p), distance.and_then(|d| r.convert(d.promote()))) else {
                    return self.null_pointer(node);
                };
                self.arithmetic(op, p, &x, &y, node)
            }
        }
    }

    fn arithmetic(&self, op: BinaryOp, p: Primitive, x: &Value, y: &Value, node: &Node) -> EvalResult<Value> {
        let computed = if p.is_floating() {
            x.as_f64()
                .zip(y.as_f64())
                .and_then(|(x, y)| floating_op(op, x, y))
                .and_then(|v| Value::Double(v).convert(p))
        } else {
            x.as_i64()
                .zip(y.as_i64())
                .and_then(|(x, y)| integral_op(op, x, y, p == Primitive::Long))
                .and_then(|v| Value::Long(v).convert(p))
        };
        match computed {
            Some(value) => Ok(value),
            None => self.raise(ARITHMETIC, Some("/ by zero".to_string()), node),
        }
    }

    pub(super) fn unary(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        op: UnaryOp,
        operand: &Node,
    ) -> EvalResult<Operand> {
        if op.is_step() {
            return self.step(env, frame, node, op, operand);
        }
        let value = self.operand(env, frame, operand)?;
        let ty = match op {
            UnaryOp::Plus | UnaryOp::Minus => value.ty.numeric().map(Primitive::promote),
            UnaryOp::BitNot => value.ty.integral().map(Primitive::promote),
            _ => value.ty.unboxed().filter(|p| *p == Primitive::Boolean),
        };
        let Some(p) = ty else {
            return undefined(op, &[value.ty], node);
        };
        let Some(v) = value.value else {
            return Ok(Operand::typed(Type::primitive(p)));
        };
        let Some(v) = v.convert(p) else {
            return self.null_pointer(operand);
        };
        let result = match (op, v) {
            (UnaryOp::Minus, Value::Int(x)) => Value::Int(x.wrapping_neg()),
            (UnaryOp::Minus, Value::Long(x)) => Value::Long(x.wrapping_neg()),
            (UnaryOp::Minus, Value::Float(x)) => Value::Float(-x),
            (UnaryOp::Minus, Value::Double(x)) => Value::Double(-x),
            (UnaryOp::BitNot, Value::Int(x)) => Value::Int(!x),
            (UnaryOp::BitNot, Value::Long(x)) => Value::Long(!x),
            (UnaryOp::Not, Value::Boolean(b)) => Value::Boolean(!b),
            (_, v) => v,
        };
        Ok(Operand::new(Type::primitive(p), Some(result)))
    }

    /// `++` and `--` in prefix or postfix position.
    fn step(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        op: UnaryOp,
        operand: &Node,
    ) -> EvalResult<Operand> {
        let place = self.place(env, frame, operand)?;
        let ty = place.ty().clone();
        let Some(p) = ty.numeric() else {
            return undefined(op, &[ty], node);
        };
        let old = self.load(env, frame, &place, operand)?;
        let Some(old) = old.value else {
            self.store(env, &place, None, operand)?;
            return Ok(Operand::typed(ty));
        };
        let Some(current) = old.convert(p) else {
            return self.null_pointer(operand);
        };
        let delta = match op {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => BinaryOp::Add,
            _ => BinaryOp::Sub,
        };
        let wide = Primitive::promote_binary(p, Primitive::Int);
        let one = Value::Int(1).convert(wide).unwrap_or(Value::Int(1));
        let widened = current.convert(wide).unwrap_or(current.clone());
        let next = self.arithmetic(delta, wide, &widened, &one, node)?;
        let next = next.convert(p).unwrap_or(next);
        self.store(env, &place, Some(next.clone()), operand)?;
        let result = match op {
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => next,
            _ => current,
        };
        Ok(Operand::new(ty, Some(result)))
    }

    /// `target op= value`, evaluated as `target = (T) (target op value)`.
    pub(super) fn compound(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        op: BinaryOp,
        target: &Node,
        value: &Node,
    ) -> EvalResult<Operand> {
        let place = self.place(env, frame, target)?;
        let ty = place.ty().clone();
        let lhs = self.load(env, frame, &place, target)?;
        let rhs = self.operand(env, frame, value)?;
        let result = self.binary_type(op, &lhs.ty, &rhs.ty, node)?;
        let narrows = match (ty.as_primitive(), result.as_primitive()) {
            (Some(to), Some(from)) => (to == Primitive::Boolean) == (from == Primitive::Boolean),
            _ => relations::is_assignable(self.catalog, &ty, &result),
        };
        if !narrows {
            return fail(
                EvaluationErrorKind::TypeMismatch {
                    from: result,
                    to: ty,
                },
                node,
            );
        }
        let computed = match (lhs.value, rhs.value) {
            (Some(l), Some(r)) => {
                let v = self.apply(op, &lhs.ty, &rhs.ty, &result, l, r, node)?;
                let v = match ty.unboxed() {
                    Some(p) => v.convert(p).unwrap_or(v),
                    None => v,
                };
                Some(self.coerce(v, &ty, node)?)
            }
            _ => None,
        };
        self.store(env, &place, computed.clone(), target)?;
        Ok(Operand::new(ty, computed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic_wraps() {
        assert_eq!(integral_op(BinaryOp::Add, i64::from(i32::MAX), 1, false), Some(i64::from(i32::MIN)));
        assert_eq!(integral_op(BinaryOp::Div, i64::from(i32::MIN), -1, false), Some(i64::from(i32::MIN)));
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(integral_op(BinaryOp::Div, 1, 0, false), None);
        assert_eq!(integral_op(BinaryOp::Rem, 1, 0, true), None);
        assert_eq!(floating_op(BinaryOp::Div, 1.0, 0.0), Some(f64::INFINITY));
    }

    #[test]
    fn shift_distance_is_masked() {
        assert_eq!(integral_op(BinaryOp::Shl, 1, 33, false), Some(2));
        assert_eq!(integral_op(BinaryOp::Shl, 1, 65, true), Some(2));
        assert_eq!(integral_op(BinaryOp::UShr, -1, 28, false), Some(15));
        assert_eq!(integral_op(BinaryOp::Shr, -16, 2, false), Some(-4));
    }

    #[test]
    fn nan_compares_false() {
        assert!(!compare(BinaryOp::Lt, f64::NAN.partial_cmp(&1.0)));
        assert!(!compare(BinaryOp::Ge, f64::NAN.partial_cmp(&1.0)));
        assert!(compare(BinaryOp::Le, Some(std::cmp::Ordering::Equal)));
    }
}
