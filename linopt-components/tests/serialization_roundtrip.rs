//! Round-trip tests: every entity kind through the codec, checked by its unitary action

use linopt_components::{compute_unitary, random_unitary, symbolic_unitary};
use linopt_core::serialization::{
    deserialize_circuit, deserialize_matrix, deserialize_state, deserialize_svdistribution,
    serialize, serialize_value,
};
use linopt_core::{
    BasicState, Bindings, Circuit, Component, Matrix, NumericMatrix, OpticsError, Parameter,
    SVDistribution,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

#[test]
fn test_numeric_matrix_serialization() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(2022);
    let input = random_unitary(10, &mut rng).unwrap();
    let decoded = deserialize_matrix(&serialize(&input).unwrap()).unwrap();
    assert_eq!(decoded, Matrix::Numeric(input.clone()));
    assert!(decoded.as_numeric().unwrap().is_unitary(1e-10));

    let rows: Vec<Vec<f64>> = vec![
        (1..=10).map(f64::from).collect(),
        (11..=20).map(f64::from).collect(),
    ];
    let input = NumericMatrix::from_real_rows(&rows).unwrap();
    let decoded = deserialize_matrix(&serialize(&input).unwrap()).unwrap();
    assert_eq!(decoded.as_numeric(), Some(&input));
    assert_eq!((decoded.rows(), decoded.cols()), (2, 10));
}

#[test]
fn test_symbolic_matrix_serialization() {
    init_tracing();
    let bs = Component::bs(Parameter::symbol("theta"));
    let input = symbolic_unitary(&bs).unwrap();
    assert!(input.is_symbolic());

    let decoded = deserialize_matrix(&serialize(&input).unwrap()).unwrap();
    assert!(decoded.is_symbolic());

    let theta_value: f64 = StdRng::seed_from_u64(5).gen();
    let mut bindings = Bindings::new();
    bindings.insert("theta".to_string(), theta_value);

    let reference = compute_unitary(&Component::bs(theta_value)).unwrap();
    let restored = decoded.subs(&bindings);
    assert!(!restored.is_symbolic());
    assert!(restored.as_numeric().unwrap().approx_eq(&reference, 1e-12));
}

fn build_test_circuit() -> Circuit {
    let mut rng = StdRng::seed_from_u64(3);

    let mut c1 = Circuit::new(3);
    c1.push(Component::bs(1.814))
        .unwrap()
        .push(Component::ps(0.215))
        .unwrap()
        .push(Component::perm(vec![2, 0, 1]).unwrap())
        .unwrap()
        .add(1, Component::pbs())
        .unwrap()
        .push(Component::unitary(random_unitary(3, &mut rng).unwrap()).unwrap())
        .unwrap();

    let bs_h = Component::bs_h(0.36)
        .with_param("phi_tl", 1.94)
        .unwrap()
        .with_param("phi_br", 5.8817)
        .unwrap()
        .with_param("phi_bl", 0.0179)
        .unwrap();
    let mut c2 = Circuit::new(2);
    c2.push(bs_h)
        .unwrap()
        .push(Component::perm(vec![1, 0]).unwrap())
        .unwrap();

    c1.add_circuit(1, c2, false)
        .unwrap()
        .add(0, Component::hwp(0.23))
        .unwrap()
        .add(1, Component::qwp(0.17))
        .unwrap()
        .add(2, Component::wp(0.4, 0.5))
        .unwrap();
    c1.add(0, Component::pr(0.89)).unwrap();
    c1
}

fn check_circuits_eq(a: &Circuit, b: &Circuit) {
    assert_eq!(a.ncomponents(), b.ncomponents());
    let (flat_a, flat_b) = (a.flatten(), b.flatten());
    assert_eq!(flat_a.len(), flat_b.len());
    for ((ports_a, comp_a), (ports_b, comp_b)) in flat_a.iter().zip(&flat_b) {
        assert_eq!(comp_a.kind(), comp_b.kind());
        assert_eq!(ports_a, ports_b);
        assert_eq!(
            compute_unitary(comp_a).unwrap(),
            compute_unitary(comp_b).unwrap(),
            "{} differs after decode",
            comp_a
        );
    }
}

#[test]
fn test_circuit_serialization() {
    init_tracing();
    let c1 = build_test_circuit();
    let json = serialize(&c1).unwrap();
    let decoded = deserialize_circuit(&json).unwrap();
    check_circuits_eq(&c1, &decoded);

    let wire: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(wire["type"], "circuit");
    assert_eq!(wire["width"], 3);
    let nested = &wire["placements"][5];
    assert_eq!(nested["ports"], serde_json::json!([1, 2]));
    assert_eq!(nested["circuit"]["placements"][0]["component"]["kind"], "BS.H");

    // sub-circuit stays nested on the wire and after decode
    assert_eq!(decoded.depth(), 1);
    assert_eq!(decoded.len(), c1.len());
}

#[test]
fn test_circuit_unitary_survives() {
    use linopt_components::circuit_unitary;

    let c1 = build_test_circuit();
    let decoded = deserialize_circuit(&serialize(&c1).unwrap()).unwrap();
    let before = circuit_unitary(&c1, &Bindings::new()).unwrap();
    let after = circuit_unitary(&decoded, &Bindings::new()).unwrap();
    assert_eq!(before.rows(), 6);
    assert!(after.approx_eq(&before, 1e-12));
    assert!(after.is_unitary(1e-9));
}

#[test]
fn test_symbolic_circuit_serialization() {
    let mut c = Circuit::new(2);
    c.push(Component::bs(Parameter::symbol("theta")))
        .unwrap()
        .add(1, Component::ps(Parameter::symbol("phi")))
        .unwrap();

    let decoded = deserialize_circuit(&serialize_value(&c).unwrap()).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..3 {
        let mut b = Bindings::new();
        b.insert("theta".to_string(), rng.gen_range(0.0..3.0));
        b.insert("phi".to_string(), rng.gen_range(0.0..6.0));
        let expected = linopt_components::circuit_unitary(&c, &b).unwrap();
        let actual = linopt_components::circuit_unitary(&decoded, &b).unwrap();
        assert!(actual.approx_eq(&expected, 1e-12));
    }
}

#[test]
fn test_fockstate_serialization() {
    let states = vec![
        BasicState::parse("|0,1>").unwrap(),
        BasicState::from(vec![0, 1, 0, 0, 1, 0]),
        BasicState::parse("|{P:H}{P:V},0>").unwrap(),
    ];
    for s in states {
        let decoded = deserialize_state(&serialize(&s).unwrap()).unwrap();
        assert_eq!(s, decoded);
    }

    let annotated = deserialize_state("|{P:H}{P:V},0>").unwrap();
    assert_eq!(annotated.occupation(0), 2);
    assert_eq!(annotated.occupation(1), 0);
    assert_eq!(annotated.annotations(0).len(), 2);
}

#[test]
fn test_svdistribution_deserialization() {
    let mut svd = SVDistribution::new();
    svd.insert(BasicState::parse("|0,1>").unwrap(), 0.2).unwrap();
    svd.insert(BasicState::parse("|1,0>").unwrap(), 0.3).unwrap();
    svd.insert(BasicState::parse("|1,1>").unwrap(), 0.5).unwrap();

    let json = r#"{"|0,1>":0.2,"|1,0>":0.3,"|1,1>":0.5}"#;
    let svd2 = deserialize_svdistribution(json).unwrap();
    assert_eq!(svd, svd2);

    let svd3 = deserialize_svdistribution(&serialize(&svd).unwrap()).unwrap();
    assert_eq!(svd, svd3);
}

#[test]
fn test_unsupported_value() {
    let component = Component::ps(0.1);
    assert!(matches!(
        serialize_value(&component),
        Err(OpticsError::UnsupportedType(name)) if name.contains("Component")
    ));
}
