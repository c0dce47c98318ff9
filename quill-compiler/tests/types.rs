use proptest::prelude::*;
use quill_compiler::types::{ClassBuilder, ContractBuilder, TupleBuilder};
use quill_compiler::{Builtin, Pure, Type, Value};

fn builtin(builtin: Builtin) -> Type {
    Type::builtin(builtin)
}

fn slot(ty: Type) -> Value {
    Value::slot(ty)
}

#[test]
fn tuple_prefix_law() {
    let number = builtin(Builtin::Number);
    let string = builtin(Builtin::String);
    let boolean = builtin(Builtin::Boolean);

    let short = Type::tuple(vec![number.clone(), string.clone()]);
    let long = Type::tuple(vec![number, string, boolean]);

    assert!(short.generalizes(&long));
    assert!(!long.generalizes(&short));
}

#[test]
fn tuple_members_are_covariant() {
    let wide = Type::tuple(vec![Type::any()]);
    let narrow = Type::tuple(vec![builtin(Builtin::Number)]);
    assert!(wide.generalizes(&narrow));
    assert!(!narrow.generalizes(&wide));
}

#[test]
fn contract_structural_law() {
    let expected = ContractBuilder::new()
        .member("a", slot(builtin(Builtin::Number)))
        .build();
    let wider = ContractBuilder::new()
        .member("a", slot(builtin(Builtin::Number)))
        .member("b", slot(builtin(Builtin::String)))
        .build();
    let literal_member = ContractBuilder::new()
        .member("a", slot(Type::literal(Pure::Number(3.0))))
        .build();
    let missing = ContractBuilder::new()
        .member("b", slot(builtin(Builtin::Number)))
        .build();
    let mistyped = ContractBuilder::new()
        .member("a", slot(builtin(Builtin::String)))
        .build();

    assert!(expected.generalizes(&wider));
    assert!(expected.generalizes(&literal_member));
    assert!(!expected.generalizes(&missing));
    assert!(!expected.generalizes(&mistyped));
    assert!(!wider.generalizes(&expected));
}

#[test]
fn untyped_contract_members_only_require_presence() {
    let expected = ContractBuilder::new()
        .member("a", Value::undefined())
        .build();
    let candidate = ContractBuilder::new()
        .member("a", slot(builtin(Builtin::Boolean)))
        .build();
    assert!(expected.generalizes(&candidate));
}

#[test]
fn function_parameters_are_contravariant() {
    let number = builtin(Builtin::Number);
    let accepts_anything = Type::function(vec![Type::any()], number.clone());
    let accepts_numbers = Type::function(vec![number.clone()], number);

    // A function taking `any` can stand in for one taking `number`.
    assert!(accepts_numbers.generalizes(&accepts_anything));
    assert!(!accepts_anything.generalizes(&accepts_numbers));
}

#[test]
fn product_parameters_are_contravariant() {
    let number = builtin(Builtin::Number);
    let accepts_anything = Type::signature(Type::any(), number.clone());
    let accepts_numbers = Type::signature(number.clone(), number);

    assert!(accepts_numbers.generalizes(&accepts_anything));
    assert!(!accepts_anything.generalizes(&accepts_numbers));
}

#[test]
fn signature_results_are_covariant() {
    let number = builtin(Builtin::Number);
    let returns_any = Type::function(vec![number.clone()], Type::any());
    let returns_number = Type::function(vec![number.clone()], number.clone());

    assert!(returns_any.generalizes(&returns_number));
    assert!(!returns_number.generalizes(&returns_any));

    let product = Type::signature(Type::tuple(vec![number.clone()]), Type::any());
    assert!(product.generalizes(&returns_number));
}

#[test]
fn domain_instance_categorizes_its_constant() {
    let colors = Type::domain(["red", "green", "blue"].map(Pure::from));
    let red = colors.instance("red").expect("red is a member");

    let untyped = Value::literal(None, Pure::from("red"));
    let typed = Value::literal(Some(builtin(Builtin::String)), Pure::from("red"));
    let other = Value::literal(Some(builtin(Builtin::String)), Pure::from("x"));

    assert!(red.categorizes(&untyped));
    assert!(colors.categorizes(&untyped));
    // A typed value is judged by its type, which is wider than the domain.
    assert!(!red.categorizes(&typed));
    assert!(!colors.categorizes(&typed));
    assert!(!colors.categorizes(&other));

    let member = Value::literal(Some(red.clone()), Pure::from("red"));
    assert!(red.categorizes(&member));
    assert!(colors.categorizes(&member));
}

#[test]
fn typed_values_are_categorized_by_type_not_constant() {
    let three = Type::literal(Pure::Number(3.0));
    let typed = Value::literal(Some(builtin(Builtin::Number)), Pure::Number(3.0));
    let untyped = Value::literal(None, Pure::Number(3.0));

    assert!(!three.generalizes(&builtin(Builtin::Number)));
    assert!(!three.categorizes(&typed));
    assert!(three.categorizes(&untyped));
    assert!(Type::any().categorizes(&Value::undefined()));
    assert!(!builtin(Builtin::Number).categorizes(&Value::undefined()));
}

#[test]
fn contract_members_compare_by_type_not_constant() {
    let expected = ContractBuilder::new()
        .member("a", slot(Type::literal(Pure::Number(3.0))))
        .build();
    let number_slot = ContractBuilder::new()
        .member("a", slot(builtin(Builtin::Number)))
        .build();
    let number_constant = ContractBuilder::new()
        .member(
            "a",
            Value::literal(Some(builtin(Builtin::Number)), Pure::Number(3.0)),
        )
        .build();
    let untyped_constant = ContractBuilder::new()
        .member("a", Value::literal(None, Pure::Number(3.0)))
        .build();

    assert!(!expected.generalizes(&number_slot));
    assert!(!expected.generalizes(&number_constant));
    assert!(!expected.generalizes(&untyped_constant));

    let open = ContractBuilder::new().member("a", slot(Type::any())).build();
    assert!(open.generalizes(&untyped_constant));
    assert!(open.generalizes(&number_constant));
}

#[test]
fn domain_subsets_and_members() {
    let colors = Type::domain(["red", "green", "blue"].map(Pure::from));
    let warm = Type::domain(["red"].map(Pure::from));
    let red = colors.instance("red").cloned().expect("member");

    assert!(colors.generalizes(&warm));
    assert!(!warm.generalizes(&colors));
    assert!(colors.generalizes(&red));
    assert!(builtin(Builtin::String).generalizes(&colors));
    assert!(!builtin(Builtin::Number).generalizes(&colors));
    assert!(colors.at("green").is_some_and(|value| value.pure() == Some(Pure::from("green"))));
}

#[test]
fn builtin_lattice() {
    let any = Type::any();
    let number = builtin(Builtin::Number);
    let void = builtin(Builtin::Void);
    let unknown = builtin(Builtin::Unknown);
    let object = builtin(Builtin::Object);
    let array = builtin(Builtin::Array);
    let function = builtin(Builtin::Function);

    assert!(any.generalizes(&unknown));
    assert!(number.generalizes(&Type::literal(Pure::Number(1.0))));
    assert!(!number.generalizes(&Type::literal(Pure::from("1"))));
    assert!(void.generalizes(&Type::literal(Pure::Null)));
    assert!(!unknown.generalizes(&number));
    assert!(!number.generalizes(&any));
    assert!(object.generalizes(&ContractBuilder::new().build()));
    assert!(array.generalizes(&Type::tuple(vec![number.clone()])));
    assert!(function.generalizes(&Type::function(vec![], number)));
}

#[test]
fn unions_accept_any_alternative() {
    let number = builtin(Builtin::Number);
    let string = builtin(Builtin::String);
    let either = Type::union(vec![number.clone(), string.clone()]);

    assert!(either.generalizes(&number));
    assert!(either.generalizes(&string));
    assert!(!either.generalizes(&builtin(Builtin::Boolean)));
    assert!(!number.generalizes(&either));
    assert!(Type::any().generalizes(&either));
    assert!(either.categorizes_pure(&Pure::from("text")));
}

#[test]
fn class_hierarchy_is_nominal_first() {
    let shape = ClassBuilder::named("Shape")
        .member("area", slot(builtin(Builtin::Number)))
        .build();
    let circle = ClassBuilder::named("Circle")
        .extends(shape.clone())
        .member("radius", slot(builtin(Builtin::Number)))
        .build();

    assert!(shape.generalizes(&circle));
    assert!(!circle.generalizes(&shape));
    assert!(circle.at("area").is_some(), "inherited members are visible");

    let contract = ContractBuilder::new()
        .member("area", slot(builtin(Builtin::Number)))
        .build();
    assert!(contract.generalizes(&circle));
    assert!(!shape.generalizes(&contract), "classes only accept classes");
}

#[test]
fn tuple_pure_is_checked_element_wise() {
    let pair = TupleBuilder::new()
        .push(builtin(Builtin::Number))
        .field("label", builtin(Builtin::String))
        .build();
    let matching = Pure::Array(vec![Pure::Number(1.0), Pure::from("one")]);
    let longer = Pure::Array(vec![Pure::Number(1.0), Pure::from("one"), Pure::Null]);
    let wrong = Pure::Array(vec![Pure::from("one"), Pure::Number(1.0)]);

    assert!(pair.categorizes_pure(&matching));
    assert!(pair.categorizes_pure(&longer));
    assert!(!pair.categorizes_pure(&wrong));
    assert_eq!(pair.describe(), "(number, label: string)");
}

#[test]
fn contract_pure_shape_check() {
    let point = ContractBuilder::new()
        .member("x", slot(builtin(Builtin::Number)))
        .build();
    let inside = Pure::Object(vec![
        ("x".to_string(), Pure::Number(1.0)),
        ("y".to_string(), Pure::Number(2.0)),
    ]);
    let outside = Pure::Object(vec![("y".to_string(), Pure::Number(2.0))]);

    assert!(point.categorizes_pure(&inside));
    assert!(!point.categorizes_pure(&outside));
    assert!(!point.categorizes_pure(&Pure::Number(1.0)));
}

#[derive(Debug, Clone)]
enum Shape {
    Builtin(Builtin),
    Number(i32),
    Text(String),
    Tuple(Vec<Shape>),
    Function(Vec<Shape>, Box<Shape>),
    Union(Vec<Shape>),
    Domain(Vec<String>),
    Contract(Vec<(String, Shape)>),
}

impl Shape {
    /// Builds a fresh type, sharing no nodes with earlier builds.
    fn build(&self) -> Type {
        match self {
            Shape::Builtin(builtin) => Type::builtin(*builtin),
            Shape::Number(value) => Type::literal(Pure::Number(f64::from(*value))),
            Shape::Text(value) => Type::literal(Pure::from(value.as_str())),
            Shape::Tuple(members) => Type::tuple(members.iter().map(Shape::build).collect()),
            Shape::Function(parameters, output) => Type::function(
                parameters.iter().map(Shape::build).collect(),
                output.build(),
            ),
            Shape::Union(alternatives) => {
                Type::union(alternatives.iter().map(Shape::build).collect())
            }
            Shape::Domain(values) => Type::domain(values.iter().map(|v| Pure::from(v.as_str()))),
            Shape::Contract(members) => members
                .iter()
                .fold(ContractBuilder::new(), |builder, (name, shape)| {
                    builder.member(name.clone(), Value::slot(shape.build()))
                })
                .build(),
        }
    }
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        prop::sample::select(Builtin::ALL.to_vec()).prop_map(Shape::Builtin),
        any::<i32>().prop_map(Shape::Number),
        "[a-z]{1,3}".prop_map(Shape::Text),
        prop::collection::vec("[a-z]{1,3}", 1..4).prop_map(Shape::Domain),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Shape::Tuple),
            (prop::collection::vec(inner.clone(), 0..3), inner.clone())
                .prop_map(|(parameters, output)| Shape::Function(parameters, Box::new(output))),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Shape::Union),
            prop::collection::vec(("[a-z]{1,2}", inner), 0..3).prop_map(Shape::Contract),
        ]
    })
}

proptest! {
    #[test]
    fn every_type_generalizes_itself(shape in arb_shape()) {
        let ty = shape.build();
        prop_assert!(ty.generalizes(&ty));
    }

    #[test]
    fn structurally_equal_types_generalize_each_other(shape in arb_shape()) {
        let first = shape.build();
        let second = shape.build();
        prop_assert!(first.generalizes(&second), "{} does not generalize its copy", first);
        prop_assert!(second.generalizes(&first));
    }

    #[test]
    fn any_generalizes_everything(shape in arb_shape()) {
        prop_assert!(Type::any().generalizes(&shape.build()));
    }
}
