use anyhow::Result;
use graftjit::{DType, Tensor, TensorSig, TensorValue, Value, ValueKind, F16};

use crate::common;

#[test]
fn f16_conversion_round_trips_representable_values() {
    for value in [0.0f32, 1.5, -2.25, 65504.0, f32::powi(2.0, -14)] {
        assert_eq!(F16::from_f32(value).to_f32(), value);
    }
    assert!(F16::from_f32(1.0e6).to_f32().is_infinite());
    assert!(F16::from_f32(f32::NAN).to_f32().is_nan());
}

#[test]
fn dtype_identifiers() -> Result<()> {
    for dtype in DType::ALL {
        assert_eq!(DType::from_ident(dtype.as_str())?, dtype);
    }
    assert!(DType::from_ident("bf16").is_err());
    assert!(DType::F16.is_float());
    assert!(DType::U8.is_int());
    assert!(!DType::Bool.is_numeric());
    Ok(())
}

#[test]
fn shape_must_match_data() {
    assert!(Tensor::with_shape(vec![1i32, 2, 3], vec![2, 2]).is_err());
    let scalar = Tensor::from_scalar(4u8);
    assert!(scalar.shape().is_empty());
    assert_eq!(scalar.len(), 1);
}

#[test]
fn zeros_and_signatures() -> Result<()> {
    let zeros = TensorValue::zeros(DType::F16, &[2, 3]);
    assert_eq!(zeros.sig(), TensorSig::new(DType::F16, vec![2, 3]));
    assert_eq!(zeros.len(), 6);
    common::assert_tensor_eq(
        &TensorValue::zeros(DType::I64, &[2]),
        &common::tensor(&[0i64, 0]),
    )?;
    assert_eq!(TensorValue::scalar_from_f64(DType::I32, 1.0), None);
    Ok(())
}

#[test]
fn host_values_convert_to_rank_zero_tensors() {
    let int = Value::Int(3);
    assert_eq!(int.kind(), ValueKind::Int);
    assert_eq!(int.to_tensor(), Some(TensorValue::from(3i64)));
    assert_eq!(Value::Float(0.5).to_tensor(), Some(TensorValue::from(0.5f64)));
    assert_eq!(Value::Bool(true).to_tensor(), Some(TensorValue::from(true)));

    let tensor: Value = common::tensor(&[1i8, 2]).into();
    assert_eq!(
        tensor.kind(),
        ValueKind::Tensor(TensorSig::new(DType::I8, vec![2]))
    );
    assert!(Value::List(vec![Value::Int(1)]).to_tensor().is_none());
}

#[test]
fn display_truncates_long_tensors() {
    let long: Value = common::tensor(&[1i64, 2, 3, 4, 5]).into();
    assert_eq!(long.to_string(), "i64[5] {1, 2 ... 4, 5}");
    let short: Value = common::tensor(&[0.5f32, 1.25]).into();
    assert_eq!(short.to_string(), "f32[2] {0.50, 1.25}");
    assert_eq!(Value::Int(4).to_string(), "4");
}
