use std::cmp::Ordering;
use std::fmt;

use strum::Display;

use crate::domain::entity::Value;
use crate::domain::query::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Order {
    #[strum(serialize = "asc")]
    Asc,
    #[strum(serialize = "desc")]
    Desc,
}

/// NULLの並び位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    /// NULLを最小値として扱う（昇順で先頭、降順で末尾）
    #[default]
    Default,
    NullsFirst,
    NullsLast,
}

/// ORDER BY の1項目
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecifier {
    pub target: Expression,
    pub order: Order,
    pub null_handling: NullHandling,
}

impl OrderSpecifier {
    pub fn new(target: Expression, order: Order) -> Self {
        Self {
            target,
            order,
            null_handling: NullHandling::Default,
        }
    }

    /// NULLを方向に関係なく末尾に置く
    pub fn nulls_last(mut self) -> Self {
        self.null_handling = NullHandling::NullsLast;
        self
    }

    /// NULLを方向に関係なく先頭に置く
    pub fn nulls_first(mut self) -> Self {
        self.null_handling = NullHandling::NullsFirst;
        self
    }

    /// この項目のソートキー同士を比較する
    ///
    /// NULLの位置は `null_handling` で決まり、昇順/降順の反転を受けない。
    pub fn compare(&self, left: &Value, right: &Value) -> Ordering {
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) | (false, true) => {
                let nulls_first = match self.null_handling {
                    NullHandling::NullsFirst => true,
                    NullHandling::NullsLast => false,
                    NullHandling::Default => self.order == Order::Asc,
                };
                match (left.is_null(), nulls_first) {
                    (true, true) | (false, false) => Ordering::Less,
                    _ => Ordering::Greater,
                }
            }
            (false, false) => {
                let ordering = left.compare(right).unwrap_or(Ordering::Equal);
                match self.order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            }
        }
    }
}

impl fmt::Display for OrderSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target, self.order)?;
        match self.null_handling {
            NullHandling::Default => Ok(()),
            NullHandling::NullsFirst => write!(f, " nulls first"),
            NullHandling::NullsLast => write!(f, " nulls last"),
        }
    }
}

/// `order_by` に渡せるソート指定の並び
///
/// 並びの順がそのまま優先順位になる（同順位は後ろの指定で決まる）。
pub trait IntoOrderSpecifiers {
    fn into_order_specifiers(self) -> Vec<OrderSpecifier>;
}

impl IntoOrderSpecifiers for OrderSpecifier {
    fn into_order_specifiers(self) -> Vec<OrderSpecifier> {
        vec![self]
    }
}

impl IntoOrderSpecifiers for Vec<OrderSpecifier> {
    fn into_order_specifiers(self) -> Vec<OrderSpecifier> {
        self
    }
}

impl<const N: usize> IntoOrderSpecifiers for [OrderSpecifier; N] {
    fn into_order_specifiers(self) -> Vec<OrderSpecifier> {
        self.into_iter().collect()
    }
}

impl IntoOrderSpecifiers for (OrderSpecifier, OrderSpecifier) {
    fn into_order_specifiers(self) -> Vec<OrderSpecifier> {
        vec![self.0, self.1]
    }
}

impl IntoOrderSpecifiers for (OrderSpecifier, OrderSpecifier, OrderSpecifier) {
    fn into_order_specifiers(self) -> Vec<OrderSpecifier> {
        vec![self.0, self.1, self.2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn specifier(order: Order, null_handling: NullHandling) -> OrderSpecifier {
        OrderSpecifier {
            target: Expression::Literal(Value::Null),
            order,
            null_handling,
        }
    }

    #[test_case(Order::Asc, NullHandling::NullsLast, Ordering::Greater; "asc nulls last")]
    #[test_case(Order::Desc, NullHandling::NullsLast, Ordering::Greater; "desc nulls last")]
    #[test_case(Order::Asc, NullHandling::NullsFirst, Ordering::Less; "asc nulls first")]
    #[test_case(Order::Desc, NullHandling::NullsFirst, Ordering::Less; "desc nulls first")]
    #[test_case(Order::Asc, NullHandling::Default, Ordering::Less; "asc default")]
    #[test_case(Order::Desc, NullHandling::Default, Ordering::Greater; "desc default")]
    fn null_placement(order: Order, null_handling: NullHandling, expected: Ordering) {
        let specifier = specifier(order, null_handling);
        assert_eq!(specifier.compare(&Value::Null, &Value::Text("member5".into())), expected);
        assert_eq!(specifier.compare(&Value::Text("member5".into()), &Value::Null), expected.reverse());
    }

    #[test]
    fn direction_applies_to_values() {
        let desc = specifier(Order::Desc, NullHandling::Default);
        assert_eq!(desc.compare(&Value::Integer(40), &Value::Integer(10)), Ordering::Less);
    }
}
