//! Tests for serialization functionality

#![cfg(test)]
#![cfg(feature = "serialization")]

use crate::expr::{Bindings, Expr};
use crate::serialization::{
    deserialize_circuit, deserialize_matrix, deserialize_state, deserialize_svdistribution,
    serialize, Codec, CodecConfig,
};
use crate::value::Value;
use crate::{
    BasicState, Circuit, Component, Matrix, NumericMatrix, OpticsError, Parameter,
    SVDistribution, SymbolicMatrix,
};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> NumericMatrix {
    let data = (0..rows * cols)
        .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    NumericMatrix::new(rows, cols, data).unwrap()
}

#[test]
fn test_numeric_matrix_is_bit_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    for (rows, cols) in [(1, 1), (3, 5), (8, 8)] {
        let m = random_matrix(&mut rng, rows, cols);
        let decoded = deserialize_matrix(&serialize(&m).unwrap()).unwrap();
        assert_eq!(decoded, Matrix::Numeric(m));
    }
}

#[test]
fn test_extreme_magnitudes_survive() {
    let m = NumericMatrix::new(
        1,
        3,
        vec![
            Complex64::new(1e-300, -5e-324),
            Complex64::new(1.7976931348623157e308, 0.1),
            Complex64::new(-0.0, 1.0 / 3.0),
        ],
    )
    .unwrap();
    let decoded = deserialize_matrix(&serialize(&m).unwrap()).unwrap();
    assert_eq!(decoded.as_numeric(), Some(&m));
}

#[test]
fn test_symbolic_matrix_agrees_after_binding() {
    let theta = Expr::symbol("theta");
    let half = Expr::div(theta.clone(), Expr::Number(2.0));
    let cells = vec![
        Value::from_expr(Expr::cos(half.clone())),
        Value::from_expr(Expr::mul(Expr::i(), Expr::sin(half.clone()))),
        Value::from_expr(Expr::mul(Expr::i(), Expr::sin(half.clone()))),
        Value::from_expr(Expr::cos(half)),
    ];
    let m = SymbolicMatrix::new(2, 2, cells).unwrap();

    let decoded = deserialize_matrix(&serialize(&m).unwrap()).unwrap();
    assert!(decoded.is_symbolic());
    assert_eq!(decoded.free_symbols().into_iter().collect::<Vec<_>>(), vec!["theta"]);

    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..5 {
        let mut b = Bindings::new();
        b.insert("theta".to_string(), rng.gen_range(0.0..std::f64::consts::TAU));
        let expected = m.evaluate(&b).unwrap();
        let actual = decoded.evaluate(&b).unwrap();
        assert!(actual.approx_eq(&expected, 1e-12));
    }
}

#[test]
fn test_symbolic_matrix_mixed_cells() {
    let m = SymbolicMatrix::new(
        1,
        2,
        vec![
            Value::from(Complex64::new(0.5, 0.25)),
            Value::from(Expr::parse("x**2 - y").unwrap()),
        ],
    )
    .unwrap();
    let decoded = deserialize_matrix(&serialize(&m).unwrap()).unwrap();
    assert_eq!(decoded, Matrix::Symbolic(m));
}

#[test]
fn test_pretty_output_decodes() {
    let mut c = Circuit::new(2);
    c.push(Component::bs(Parameter::symbol("theta"))).unwrap();

    let codec = Codec::new(CodecConfig::readable()).unwrap();
    let json = codec.serialize(&c).unwrap();
    assert!(json.contains("\n  "));
    assert_eq!(codec.deserialize_circuit(&json).unwrap(), c);
}

#[test]
fn test_circuit_wire_shape() {
    let mut c = Circuit::new(2);
    c.push(Component::ps(0.5)).unwrap();
    let json = serialize(&c).unwrap();
    assert_eq!(
        json,
        r#"{"type":"circuit","version":1,"width":2,"placements":[{"ports":[0],"component":{"kind":"PS","params":{"phi":[0.5,0.0]}}}]}"#
    );
}

#[test]
fn test_circuit_decode_errors() {
    let decode = |placement: &str| {
        deserialize_circuit(&format!(
            r#"{{"type":"circuit","version":1,"width":2,"placements":[{}]}}"#,
            placement
        ))
    };

    assert!(matches!(
        decode(r#"{"ports":[0],"component":{"kind":"XYZ"}}"#),
        Err(OpticsError::UnknownKind(_))
    ));
    assert!(matches!(
        decode(r#"{"ports":[2],"component":{"kind":"PS"}}"#),
        Err(OpticsError::Range(_))
    ));
    assert!(matches!(
        decode(r#"{"ports":[0],"component":{"kind":"BS.Rx"}}"#),
        Err(OpticsError::Shape(_))
    ));
    assert!(matches!(
        decode(r#"{"ports":[0]}"#),
        Err(OpticsError::Shape(_))
    ));
    assert!(matches!(
        decode(r#"{"ports":[0],"component":{"kind":"PS","params":{"phi":[0.1,0.2]}}}"#),
        Err(OpticsError::Range(_))
    ));
    assert!(matches!(
        decode(r#"{"ports":[0,1],"component":{"kind":"PERM","perm":[1,1]}}"#),
        Err(OpticsError::Shape(_))
    ));
    assert!(decode(r#"{"ports":[0,1],"component":{"kind":"PERM","perm":[1,0]}}"#).is_ok());
}

#[test]
fn test_future_version_rejected() {
    let json = r#"{"type":"circuit","version":99,"width":1,"placements":[]}"#;
    assert!(matches!(
        deserialize_circuit(json),
        Err(OpticsError::VersionMismatch { expected: 1, actual: 99 })
    ));
    let lenient = Codec::new(CodecConfig::lenient()).unwrap();
    assert_eq!(lenient.deserialize_circuit(json).unwrap(), Circuit::new(1));
}

#[test]
fn test_symbolic_circuit_binds_after_decode() {
    let mut c = Circuit::new(2);
    c.push(Component::bs_h(Expr::parse("2*alpha").unwrap()))
        .unwrap()
        .add(1, Component::ps(Parameter::symbol("beta")))
        .unwrap();

    let decoded = deserialize_circuit(&serialize(&c).unwrap()).unwrap();
    assert_eq!(decoded.free_symbols().len(), 2);

    let mut b = Bindings::new();
    b.insert("alpha".to_string(), 0.25);
    b.insert("beta".to_string(), 1.0);
    assert_eq!(decoded.subs(&b), c.subs(&b));
    assert!(!decoded.subs(&b).is_symbolic());
}

#[test]
fn test_state_and_distribution_through_facade() {
    let s: BasicState = "|{P:H}{P:V},0>".parse().unwrap();
    assert_eq!(deserialize_state(&serialize(&s).unwrap()).unwrap(), s);

    let mut d = SVDistribution::new();
    d.insert(s.clone(), 0.25).unwrap();
    d.insert(BasicState::new(&[0, 2]), 0.75).unwrap();
    let back = deserialize_svdistribution(&serialize(&d).unwrap()).unwrap();
    assert_eq!(back, d);
}

#[test]
fn test_overflowing_shape_is_shape_error() {
    let half = 1usize << (usize::BITS / 2);
    let json = format!(
        r#"{{"type":"matrix","rows":{},"cols":{},"cells":[]}}"#,
        half, half
    );
    assert!(matches!(deserialize_matrix(&json), Err(OpticsError::Shape(_))));
}

#[test]
fn test_reserved_symbol_names_not_encoded() {
    for name in ["E", "I", "pi", "sin", "two words"] {
        let mut c = Circuit::new(1);
        c.push(Component::ps(Parameter::symbol(name))).unwrap();
        assert!(
            matches!(serialize(&c), Err(OpticsError::Parse { .. })),
            "'{}' should not encode",
            name
        );

        let m = SymbolicMatrix::new(1, 1, vec![Value::from(Expr::symbol(name))]).unwrap();
        assert!(serialize(&m).is_err());
    }

    let mut c = Circuit::new(1);
    c.push(Component::ps(Parameter::try_symbol("phi").unwrap())).unwrap();
    let decoded = deserialize_circuit(&serialize(&c).unwrap()).unwrap();
    assert_eq!(decoded.free_symbols(), c.free_symbols());
}

#[test]
fn test_hostile_cells_fail_cleanly() {
    let deep = format!("{}x{}", "(".repeat(200_000), ")".repeat(200_000));
    let json = serde_json::json!({"type": "matrix", "rows": 1, "cols": 1, "cells": [deep]});
    match deserialize_matrix(&json.to_string()) {
        Err(OpticsError::Parse { context, .. }) => assert_eq!(context, "matrix cell (0, 0)"),
        other => panic!("expected parse error, got {:?}", other),
    }

    let json = r#"{"type":"matrix","rows":1,"cols":1,"cells":["1e999*x"]}"#;
    assert!(matches!(deserialize_matrix(json), Err(OpticsError::Parse { .. })));
}
