//! Deferred expressions for list sizes, pad lengths, switch discriminants
//! and declared sizes
//!
//! Expressions are a small closed AST evaluated against the instance being
//! marshalled (`obj`) and, for nested structures, its enclosing parent
//! (`ctx`). Nothing else is visible to an expression and evaluation has no
//! side effects.

use super::errors::{WireError, WireResult};
use super::types::{StructInstance, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    /// Number of set bits, the size of a value-mask driven list
    Popcount,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(i128),
    /// Value of a named slot of the current struct
    FieldRef(&'static str),
    /// Value of a named slot of the enclosing parent struct
    ParamRef(&'static str),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    /// Variadic mask union, used as a switch case condition
    BitOr(Vec<Expr>),
    /// Membership test, used as a switch case condition only
    ValueSet(Vec<i128>),
}

impl Expr {
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Mul, lhs, rhs)
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Div, lhs, rhs)
    }

    pub fn popcount(e: Expr) -> Expr {
        Expr::Unary(UnOp::Popcount, Box::new(e))
    }

    /// Evaluate to an integer. `ValueSet` has no scalar meaning and is
    /// rejected here; it only participates through [`Expr::matches`].
    pub fn eval(&self, obj: &StructInstance, ctx: Option<&StructInstance>) -> WireResult<i128> {
        match self {
            Expr::Lit(v) => Ok(*v),
            Expr::FieldRef(name) => slot_value(obj, ctx, name),
            Expr::ParamRef(name) => {
                let parent = ctx.ok_or_else(|| WireError::MissingField {
                    class: obj.class_name().to_string(),
                    field: name.to_string(),
                })?;
                // The parent's own enclosing context is out of reach here.
                slot_value(parent, None, name)
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(obj, ctx)?;
                let r = rhs.eval(obj, ctx)?;
                match op {
                    BinOp::Add => Ok(l.wrapping_add(r)),
                    BinOp::Sub => Ok(l.wrapping_sub(r)),
                    BinOp::Mul => Ok(l.wrapping_mul(r)),
                    BinOp::Div => {
                        if r == 0 {
                            Err(bad_expr(obj, "division by zero"))
                        } else {
                            Ok(l / r)
                        }
                    }
                    BinOp::And => Ok(l & r),
                    BinOp::Or => Ok(l | r),
                    BinOp::Xor => Ok(l ^ r),
                    BinOp::Shl => Ok(l.wrapping_shl(r as u32)),
                    BinOp::Shr => Ok(l.wrapping_shr(r as u32)),
                }
            }
            Expr::Unary(op, e) => {
                let v = e.eval(obj, ctx)?;
                match op {
                    UnOp::Neg => Ok(v.wrapping_neg()),
                    UnOp::Popcount => Ok(v.count_ones() as i128),
                }
            }
            Expr::BitOr(masks) => {
                let mut acc = 0;
                for m in masks {
                    acc |= m.eval(obj, ctx)?;
                }
                Ok(acc)
            }
            Expr::ValueSet(_) => Err(bad_expr(obj, "value set used as a scalar")),
        }
    }

    /// Switch case condition test: value sets match by membership, anything
    /// else evaluates to a mask matched by a non-empty intersection.
    pub fn matches(
        &self,
        discriminant: i128,
        obj: &StructInstance,
        ctx: Option<&StructInstance>,
    ) -> WireResult<bool> {
        match self {
            Expr::ValueSet(values) => Ok(values.contains(&discriminant)),
            mask => Ok(discriminant & mask.eval(obj, ctx)? != 0),
        }
    }
}

/// Read a slot as an integer, chasing deferred expression values.
fn slot_value(obj: &StructInstance, ctx: Option<&StructInstance>, name: &str) -> WireResult<i128> {
    match obj.slot(name) {
        None => Err(WireError::MissingField {
            class: obj.class_name().to_string(),
            field: name.to_string(),
        }),
        Some(Value::Int(v)) => Ok(*v),
        Some(Value::Expr(e)) => e.eval(obj, ctx),
        Some(_) => Err(WireError::BadSlotValue {
            class: obj.class_name().to_string(),
            field: name.to_string(),
        }),
    }
}

/// Evaluate a size-bearing expression. Sizes, counts and pad lengths must
/// come out as non-negative integers.
pub(crate) fn eval_size(
    expr: &Expr,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    field: &str,
) -> WireResult<usize> {
    let v = expr.eval(obj, ctx)?;
    if v < 0 || v > usize::MAX as i128 {
        return Err(WireError::BadSizeExpression {
            class: obj.class_name().to_string(),
            field: field.to_string(),
            detail: v.to_string(),
        });
    }
    Ok(v as usize)
}

fn bad_expr(obj: &StructInstance, detail: &str) -> WireError {
    WireError::BadSizeExpression {
        class: obj.class_name().to_string(),
        field: String::new(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::descriptor::{ClassDescriptor, FieldDescriptor, FieldType, StructKind};

    fn sample() -> StructInstance {
        let class = ClassDescriptor::new(
            "Sample",
            StructKind::Struct,
            vec![
                FieldDescriptor::new("len", FieldType::U2),
                FieldDescriptor::new("mask", FieldType::U4),
            ],
        );
        let mut obj = StructInstance::new(class);
        obj.set("len", 6u16).set("mask", 0b1011u32);
        obj
    }

    #[test]
    fn test_fieldref_arithmetic() {
        let obj = sample();
        let e = Expr::mul(Expr::FieldRef("len"), Expr::Lit(4));
        assert_eq!(e.eval(&obj, None).unwrap(), 24);
    }

    #[test]
    fn test_popcount() {
        let obj = sample();
        let e = Expr::popcount(Expr::FieldRef("mask"));
        assert_eq!(e.eval(&obj, None).unwrap(), 3);
    }

    #[test]
    fn test_paramref_reads_parent() {
        let parent = sample();
        let child = {
            let class = ClassDescriptor::new("Child", StructKind::Struct, vec![]);
            StructInstance::new(class)
        };
        let e = Expr::ParamRef("len");
        assert_eq!(e.eval(&child, Some(&parent)).unwrap(), 6);
        assert!(matches!(
            e.eval(&child, None),
            Err(WireError::MissingField { .. })
        ));
    }

    #[test]
    fn test_value_set_matches_by_membership() {
        let obj = sample();
        let cond = Expr::ValueSet(vec![2, 5, 9]);
        assert!(cond.matches(5, &obj, None).unwrap());
        assert!(!cond.matches(4, &obj, None).unwrap());
        assert!(cond.eval(&obj, None).is_err());
    }

    #[test]
    fn test_bit_or_mask_condition() {
        let obj = sample();
        let cond = Expr::BitOr(vec![Expr::Lit(0b0001), Expr::Lit(0b0100)]);
        assert!(cond.matches(0b0101, &obj, None).unwrap());
        assert!(cond.matches(0b0001, &obj, None).unwrap());
        assert!(!cond.matches(0b1010, &obj, None).unwrap());
    }

    #[test]
    fn test_division_by_zero_rejected() {
        let obj = sample();
        let e = Expr::div(Expr::Lit(8), Expr::Lit(0));
        assert!(matches!(
            e.eval(&obj, None),
            Err(WireError::BadSizeExpression { .. })
        ));
    }

    #[test]
    fn test_deferred_slot_value_is_chased() {
        let class = ClassDescriptor::new(
            "Deferred",
            StructKind::Struct,
            vec![
                FieldDescriptor::new("n", FieldType::U2),
                FieldDescriptor::new("total", FieldType::U2),
            ],
        );
        let mut obj = StructInstance::new(class);
        obj.set("n", 5u16)
            .set("total", Expr::add(Expr::FieldRef("n"), Expr::Lit(3)));
        assert_eq!(Expr::FieldRef("total").eval(&obj, None).unwrap(), 8);
    }
}
