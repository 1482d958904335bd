use crate::tensor::{with_tensor, TensorValue, F16};

/// Format a value for compact human-readable output.
pub trait FormatValue {
    fn format_value(&self) -> String;
}

impl FormatValue for f32 {
    fn format_value(&self) -> String {
        format!("{:.2}", self)
    }
}

impl FormatValue for f64 {
    fn format_value(&self) -> String {
        format!("{:.2}", self)
    }
}

impl FormatValue for F16 {
    fn format_value(&self) -> String {
        format!("{:.2}", self.to_f32())
    }
}

macro_rules! impl_format_display {
    ($($ty:ty),+ $(,)?) => {
        $(impl FormatValue for $ty {
            fn format_value(&self) -> String {
                self.to_string()
            }
        })+
    };
}

impl_format_display!(i8, i16, i32, i64, u8, bool);

impl FormatValue for TensorValue {
    fn format_value(&self) -> String {
        let body = with_tensor!(self, tensor => format_truncated(&tensor.data));
        format!("{}{:?} {}", self.dtype(), self.shape(), body)
    }
}

/// Format a slice with head/tail truncation.
pub fn format_truncated<T: FormatValue>(data: &[T]) -> String {
    let len = data.len();
    if len <= 4 {
        let joined = data
            .iter()
            .map(FormatValue::format_value)
            .collect::<Vec<_>>()
            .join(", ");
        return format!("{{{}}}", joined);
    }
    format!(
        "{{{}, {} ... {}, {}}}",
        data[0].format_value(),
        data[1].format_value(),
        data[len - 2].format_value(),
        data[len - 1].format_value()
    )
}
