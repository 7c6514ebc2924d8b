use crate::common::Value;
use crate::filter::Filter;

/// Starts a filter on `field`.
///
/// ```rust,ignore
/// let adults = field("age").gte(18);
/// ```
pub fn field(field: &str) -> FluentFilter {
    FluentFilter {
        field: field.to_string(),
    }
}

pub struct FluentFilter {
    field: String,
}

impl FluentFilter {
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        Filter::Eq(self.field, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        Filter::Ne(self.field, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        Filter::Gt(self.field, value.into())
    }

    pub fn gte(self, value: impl Into<Value>) -> Filter {
        Filter::Gte(self.field, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        Filter::Lt(self.field, value.into())
    }

    pub fn lte(self, value: impl Into<Value>) -> Filter {
        Filter::Lte(self.field, value.into())
    }

    pub fn in_array(self, values: Vec<Value>) -> Filter {
        Filter::In(self.field, values)
    }
}
