//! The linear program: decision variables, constraints and the solve.
//!
//! Variables are added in named families (see [`VariableMap`]) and constraints in named blocks, so
//! that values and dual prices can be read back by name once the problem is solved.
use crate::log::is_logging_disabled_by_env;
use crate::model::Model;
use crate::table::{Cell, IndexKey, Table};
use anyhow::Result;
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::{debug, info};
use std::error::Error;
use std::fmt;
use std::hash::Hash;
use std::ops::Range;

pub mod constraints;
pub mod costs;
pub mod variables;
pub use constraints::{BaseConstraintKeys, KeysWithOffset};
pub use variables::{Timed, VariableFamily, VariableMap};

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// A linear constraint: `lower <= Σ coefficient · variable <= upper`
#[derive(Debug, Clone)]
pub struct Constraint {
    terms: Vec<(Variable, f64)>,
    lower: f64,
    upper: f64,
}

impl Constraint {
    /// A constraint with both bounds
    pub fn between(terms: Vec<(Variable, f64)>, lower: f64, upper: f64) -> Self {
        Self {
            terms,
            lower,
            upper,
        }
    }

    /// `Σ terms == rhs`
    pub fn eq(terms: Vec<(Variable, f64)>, rhs: f64) -> Self {
        Self::between(terms, rhs, rhs)
    }

    /// `Σ terms <= rhs`
    pub fn le(terms: Vec<(Variable, f64)>, rhs: f64) -> Self {
        Self::between(terms, f64::NEG_INFINITY, rhs)
    }

    /// `Σ terms >= rhs`
    pub fn ge(terms: Vec<(Variable, f64)>, rhs: f64) -> Self {
        Self::between(terms, rhs, f64::INFINITY)
    }
}

/// The rows of the problem belonging to one named block of constraints
struct ConstraintBlock {
    index_names: Vec<&'static str>,
    index: Vec<Vec<Cell>>,
    rows: Range<usize>,
}

/// An error from the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Try to solve the model, returning an error if the model is incoherent or result is non-optimal
pub fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Enable logging for the HiGHS solver, unless logging is switched off
fn enable_highs_logging(model: &mut highs::Model) {
    if is_logging_disabled_by_env() {
        return;
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

/// An urbs-style energy system model, ready to receive further constraints before solving
pub struct OptimisationModel {
    problem: Problem,
    /// The decision variables
    pub variables: VariableMap,
    constraints: IndexMap<&'static str, ConstraintBlock>,
    /// Keys of the constraints every model has
    pub base_keys: BaseConstraintKeys,
}

impl OptimisationModel {
    /// Build the variables, objective and base constraints for the model
    pub fn new(model: &Model) -> Self {
        let mut problem = Problem::default();
        let variables = VariableMap::new(&mut problem, model);
        let mut opt = Self {
            problem,
            variables,
            constraints: IndexMap::new(),
            base_keys: BaseConstraintKeys::default(),
        };
        opt.base_keys = constraints::add_base_constraints(&mut opt, model);
        debug!(
            "Optimisation problem has {} variables and {} constraints",
            opt.problem.num_cols(),
            opt.problem.num_rows()
        );

        opt
    }

    /// Add a named block of constraints, one per key of `index` for which `rule` gives a
    /// constraint.
    ///
    /// Keys for which `rule` returns `None` are skipped.
    ///
    /// # Panics
    ///
    /// If a block with the same name has already been added.
    pub fn add_constraints<K, I, F>(
        &mut self,
        name: &'static str,
        index: I,
        mut rule: F,
    ) -> KeysWithOffset<K>
    where
        K: IndexKey,
        I: IntoIterator<Item = K>,
        F: FnMut(&VariableMap, &K) -> Option<Constraint>,
    {
        assert!(
            !self.constraints.contains_key(name),
            "Constraint {name} added more than once"
        );

        // Row offset in problem. This line **must** come before we add more constraints.
        let offset = self.problem.num_rows();

        let mut keys = Vec::new();
        for key in index {
            let Some(constraint) = rule(&self.variables, &key) else {
                continue;
            };
            self.problem
                .add_row(constraint.lower..=constraint.upper, constraint.terms);
            keys.push(key);
        }

        self.constraints.insert(
            name,
            ConstraintBlock {
                index_names: K::index_names(),
                index: keys.iter().map(IndexKey::index_cells).collect(),
                rows: offset..self.problem.num_rows(),
            },
        );

        KeysWithOffset { offset, keys }
    }

    /// Whether a block of constraints with the given name exists
    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraints.contains_key(name)
    }

    /// Number of constraints in the named block (zero if there is no such block)
    pub fn num_constraints(&self, name: &str) -> usize {
        self.constraints
            .get(name)
            .map_or(0, |block| block.rows.len())
    }

    /// Solve the problem, minimising total cost
    pub fn solve(self) -> Result<Solution> {
        let mut highs_model = self.problem.optimise(Sense::Minimise);
        enable_highs_logging(&mut highs_model);

        let solved = solve_optimal(highs_model)?;
        let objective_value = solved.objective_value();
        info!("Optimal solution found with total cost {objective_value}");

        Ok(Solution {
            solution: solved.get_solution(),
            objective_value,
            variables: self.variables,
            constraints: self.constraints,
        })
    }
}

/// The solution to the optimisation problem
pub struct Solution {
    solution: highs::Solution,
    objective_value: f64,
    /// The decision variables
    pub variables: VariableMap,
    constraints: IndexMap<&'static str, ConstraintBlock>,
}

impl Solution {
    /// The value of the objective function (total cost)
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Iterate over the keys of a variable family and their values
    pub fn iter_values<'a, K: Eq + Hash>(
        &'a self,
        family: &'a VariableFamily<K>,
    ) -> impl Iterator<Item = (&'a K, f64)> + 'a {
        family.iter_values(self.solution.columns())
    }

    /// The value of a variable, or zero if the family has no variable for the key
    pub fn value<K: Eq + Hash>(&self, family: &VariableFamily<K>, key: &K) -> f64 {
        family
            .value(self.solution.columns(), key)
            .unwrap_or_default()
    }

    /// Iterate over the keys of a block of constraints and their dual values
    pub fn iter_duals<'a, K>(
        &'a self,
        keys: &'a KeysWithOffset<K>,
    ) -> impl Iterator<Item = (&'a K, f64)> + 'a {
        keys.zip_duals(self.solution.dual_rows())
    }

    /// The values of a variable family as a table with one column per index level
    pub fn variable_table<K: Eq + Hash + IndexKey>(
        &self,
        name: &str,
        family: &VariableFamily<K>,
    ) -> Table {
        family.to_table(name, self.solution.columns())
    }

    /// The dual values of a named block of constraints as a table.
    ///
    /// The value column is named after the constraint. Returns `None` if there is no such block.
    pub fn dual_table(&self, name: &str) -> Option<Table> {
        let block = self.constraints.get(name)?;
        let duals = &self.solution.dual_rows()[block.rows.clone()];

        let mut columns = block.index_names.clone();
        columns.push(name);
        let mut table = Table::new(columns);
        for (index, dual) in block.index.iter().zip(duals) {
            let mut row = index.clone();
            row.push((*dual).into());
            table.push_row(row);
        }

        Some(table)
    }

    /// The names of all blocks of constraints, in the order they were added
    pub fn constraint_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constraints.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;

    #[test]
    fn test_constraint_bounds() {
        let constraint = Constraint::le(Vec::new(), 2.0);
        assert_eq!(constraint.lower, f64::NEG_INFINITY);
        assert_eq!(constraint.upper, 2.0);

        let constraint = Constraint::eq(Vec::new(), 1.0);
        assert_eq!((constraint.lower, constraint.upper), (1.0, 1.0));
    }

    #[rstest]
    fn test_add_constraints_skips_keys(model: Model) {
        let mut opt = OptimisationModel::new(&model);
        let rows_before = opt.problem.num_rows();
        let keys = opt.add_constraints("test_block", model.years.clone(), |vars, year| {
            let terms: Vec<_> = vars
                .cap_pro
                .iter()
                .filter(|(key, _)| key.year == *year)
                .map(|(_, var)| (var, 1.0))
                .collect();
            (*year > 2030).then(|| Constraint::ge(terms, 0.0))
        });

        assert_eq!(keys.offset, rows_before);
        assert_eq!(keys.keys, [2035]);
        assert_eq!(opt.num_constraints("test_block"), 1);
        assert!(opt.has_constraint("res_vertex"));
    }

    #[rstest]
    #[should_panic(expected = "Constraint res_vertex added more than once")]
    fn test_add_constraints_duplicate_name(model: Model) {
        let mut opt = OptimisationModel::new(&model);
        opt.add_constraints("res_vertex", Vec::<u32>::new(), |_, _| None);
    }

    #[rstest]
    fn test_solve_demo(model: Model) {
        let solution = OptimisationModel::new(&model).solve().unwrap();
        assert!(solution.objective_value() > 0.0);

        let table = solution.dual_table("res_vertex").unwrap();
        assert_eq!(table.columns(), ["t", "stf", "sit", "com", "res_vertex"]);
        assert!(solution.dual_table("no_such_constraint").is_none());

        // Losses mean at least as much electricity is generated as is demanded
        let demand: f64 = model
            .site_tuples
            .iter()
            .map(|(year, site)| {
                model
                    .demand
                    .total(site, &"Elec".into(), *year, model.timesteps())
            })
            .sum();
        assert!(demand > 0.0);
        let generated: f64 = solution
            .iter_values(&solution.variables.e_pro_out)
            .filter(|(key, _)| key.key.commodity.as_str() == "Elec")
            .map(|(_, value)| value)
            .sum();
        assert!(generated >= demand * (1.0 - 1e-6));
    }
}
