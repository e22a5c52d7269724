//! Fixtures for tests
use crate::feature::{add_custom_constraints, add_tech_group_constraints};
use crate::input::load_model;
use crate::model::Model;
use crate::optimisation::{OptimisationModel, Solution};
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!($result.unwrap_err().root_cause().to_string(), $msg);
    };
}
pub(crate) use assert_error;

/// Path to the bundled demo model
#[fixture]
pub fn demo_model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("simple")
}

/// The bundled demo model
#[fixture]
pub fn model(demo_model_dir: PathBuf) -> Model {
    load_model(demo_model_dir).unwrap()
}

/// The bundled demo model with all constraints added, solved
#[fixture]
pub fn solved_model(model: Model) -> (Model, Solution) {
    let mut opt = OptimisationModel::new(&model);
    add_custom_constraints(&mut opt, &model);
    add_tech_group_constraints(&mut opt, &model);
    let solution = opt.solve().unwrap();

    (model, solution)
}
