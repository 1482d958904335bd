/// Build a `Vec<Value>` from anything convertible into `Value`.
///
/// ```no_run
/// # use graftjit::{values, Tensor};
/// let inputs = values![Tensor::new(vec![1.0f32]), 3i64, true];
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Value::from($value)),*]
    };
}
