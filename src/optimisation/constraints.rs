//! Code for adding the constraints every urbs-style model has.
use super::{Constraint, OptimisationModel, Timed, Variable, VariableMap};
use crate::commodity::{CommodityKey, CommodityType};
use crate::model::Model;
use crate::process::{FlowDirection, ProcessCommodityKey, ProcessKey};
use crate::storage::StorageKey;
use crate::transmission::TransmissionKey;
use indexmap::IndexMap;

/// Corresponding variables for a constraint along with the row offset in the solution
pub struct KeysWithOffset<T> {
    pub(super) offset: usize,
    pub(super) keys: Vec<T>,
}

impl<T> Default for KeysWithOffset<T> {
    fn default() -> Self {
        Self {
            offset: 0,
            keys: Vec::new(),
        }
    }
}

impl<T> KeysWithOffset<T> {
    /// The keys of the constraints, in row order
    pub fn keys(&self) -> &[T] {
        &self.keys
    }

    /// Number of constraints
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no constraints
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }
}

/// Indicates the timestep, support timeframe, site and commodity of each commodity balance
pub type VertexKeys = KeysWithOffset<Timed<CommodityKey>>;

/// Indicates the timestep and process tuple of each throughput limit
pub type ThroughputKeys = KeysWithOffset<Timed<ProcessKey>>;

/// Indicates the timestep and line of each transmission capacity limit
pub type TransmissionInputKeys = KeysWithOffset<Timed<TransmissionKey>>;

/// The keys for the base constraints whose dual values are of interest
#[derive(Default)]
pub struct BaseConstraintKeys {
    /// Keys for commodity balance constraints
    pub vertex: VertexKeys,
    /// Keys for per-site emission limits
    pub env_total: KeysWithOffset<CommodityKey>,
    /// Keys for process throughput limits
    pub throughput: ThroughputKeys,
    /// Keys for transmission capacity limits
    pub transmission_input: TransmissionInputKeys,
}

/// Add the base constraints of the energy system model.
///
/// Note: the order of blocks determines the row offsets, so the keys returned must only be used
/// with the solution of this problem.
pub fn add_base_constraints(opt: &mut OptimisationModel, model: &Model) -> BaseConstraintKeys {
    let vertex = add_commodity_constraints(opt, model);
    let env_total = add_environmental_constraints(opt, model);
    let throughput = add_process_constraints(opt, model);
    let transmission_input = add_transmission_constraints(opt, model);
    add_storage_constraints(opt, model);

    BaseConstraintKeys {
        vertex,
        env_total,
        throughput,
        transmission_input,
    }
}

/// The net creation of each commodity in each timestep, as terms over variables.
///
/// Process output, imports, storage discharge and stock purchases count positively; process input,
/// exports and storage charging count negatively.
fn commodity_balance(
    variables: &VariableMap,
) -> IndexMap<Timed<CommodityKey>, Vec<(Variable, f64)>> {
    let mut balance: IndexMap<_, Vec<_>> = IndexMap::new();
    let mut add = |t, key: CommodityKey, var, coeff| {
        balance
            .entry(Timed::new(t, key))
            .or_default()
            .push((var, coeff));
    };

    let process_commodity = |key: &ProcessCommodityKey| {
        CommodityKey::new(key.year, &key.site, &key.commodity)
    };
    for (key, var) in variables.e_pro_out.iter() {
        add(key.t, process_commodity(&key.key), var, 1.0);
    }
    for (key, var) in variables.e_pro_in.iter() {
        add(key.t, process_commodity(&key.key), var, -1.0);
    }
    for (key, var) in variables.e_tra_out.iter() {
        let com = CommodityKey::new(key.key.year, &key.key.site_out, &key.key.commodity);
        add(key.t, com, var, 1.0);
    }
    for (key, var) in variables.e_tra_in.iter() {
        let com = CommodityKey::new(key.key.year, &key.key.site_in, &key.key.commodity);
        add(key.t, com, var, -1.0);
    }
    let storage_commodity =
        |key: &StorageKey| CommodityKey::new(key.year, &key.site, &key.commodity);
    for (key, var) in variables.e_sto_out.iter() {
        add(key.t, storage_commodity(&key.key), var, 1.0);
    }
    for (key, var) in variables.e_sto_in.iter() {
        add(key.t, storage_commodity(&key.key), var, -1.0);
    }
    for (key, var) in variables.e_co_stock.iter() {
        add(key.t, key.key.clone(), var, 1.0);
    }

    balance
}

/// Add the commodity balance (`res_vertex`) and stock limits.
///
/// Each balance equates net creation with demand. Intermittent supply and environmental
/// commodities are not balanced.
fn add_commodity_constraints(opt: &mut OptimisationModel, model: &Model) -> VertexKeys {
    let mut balance = commodity_balance(&opt.variables);
    let index: Vec<_> = model
        .timesteps()
        .flat_map(|t| {
            model
                .commodities
                .iter()
                .filter(|(_, commodity)| {
                    !matches!(commodity.kind, CommodityType::SupIm | CommodityType::Env)
                })
                .map(move |(key, _)| Timed::new(t, key.clone()))
        })
        .collect();

    let vertex = opt.add_constraints("res_vertex", index, |_, key| {
        let terms = balance.swap_remove(key).unwrap_or_default();
        let demand = model
            .demand
            .get(&key.key.site, &key.key.commodity, key.key.year, key.t);
        (!terms.is_empty() || demand != 0.0).then(|| Constraint::eq(terms, demand))
    });

    let stock_keys = model
        .commodities
        .iter()
        .filter(|(_, commodity)| {
            commodity.kind == CommodityType::Stock && commodity.max.is_finite()
        })
        .map(|(key, _)| key.clone());
    opt.add_constraints("res_stock_total", stock_keys, |variables, key| {
        let terms = variables
            .e_co_stock
            .iter()
            .filter(|(timed, _)| timed.key == *key)
            .map(|(_, var)| (var, model.weight()))
            .collect();
        Some(Constraint::le(terms, model.commodities[key].max))
    });

    vertex
}

/// Net creation of an environmental commodity at a site, summed over all timesteps and scaled to
/// a year
fn env_terms(variables: &VariableMap, model: &Model, key: &CommodityKey) -> Vec<(Variable, f64)> {
    let weight = model.weight();
    let matches = |pc: &ProcessCommodityKey| {
        pc.year == key.year && pc.site == key.site && pc.commodity == key.commodity
    };
    let created = variables
        .e_pro_out
        .iter()
        .filter(|(timed, _)| matches(&timed.key))
        .map(|(_, var)| (var, weight));
    let consumed = variables
        .e_pro_in
        .iter()
        .filter(|(timed, _)| matches(&timed.key))
        .map(|(_, var)| (var, -weight));

    created.chain(consumed).collect()
}

/// Add per-site (`res_env_total`) and system-wide (`res_global_co2_limit`) emission limits
fn add_environmental_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> KeysWithOffset<CommodityKey> {
    let env_keys: Vec<_> = model
        .commodities
        .iter()
        .filter(|(_, commodity)| commodity.kind == CommodityType::Env)
        .map(|(key, _)| key.clone())
        .collect();

    let env_total = opt.add_constraints("res_env_total", env_keys.clone(), |variables, key| {
        let max = model.commodities[key].max;
        max.is_finite()
            .then(|| Constraint::le(env_terms(variables, model, key), max))
    });

    let limits = model.global.co2_limits.iter().map(|(year, _)| *year);
    opt.add_constraints("res_global_co2_limit", limits, |variables, year| {
        let terms: Vec<_> = env_keys
            .iter()
            .filter(|key| key.year == *year && key.commodity.as_str() == "CO2")
            .flat_map(|key| env_terms(variables, model, key))
            .collect();
        (!terms.is_empty()).then(|| Constraint::le(terms, model.global.co2_limits[year]))
    });

    env_total
}

/// The keys of the vintages of an asset still alive in `year`.
///
/// `lookup` gives the key and lifetime of the asset built in a support timeframe, if it exists
/// there. Without intertemporal modelling only the current support timeframe counts.
fn alive_vintages<K, F>(model: &Model, year: u32, mut lookup: F) -> Vec<K>
where
    F: FnMut(u32) -> Option<(K, u32)>,
{
    model
        .years
        .iter()
        .copied()
        .filter(|built| *built == year || (model.is_intertemporal() && *built < year))
        .filter_map(|built| {
            let (key, lifetime) = lookup(built)?;
            (built == year || year < built + lifetime).then_some(key)
        })
        .collect()
}

/// Add process capacity, conversion and throughput constraints
fn add_process_constraints(opt: &mut OptimisationModel, model: &Model) -> ThroughputKeys {
    let process_keys: Vec<_> = model.processes.keys().cloned().collect();
    opt.add_constraints(
        "def_process_capacity",
        process_keys.clone(),
        |variables, key| {
            let mut terms = vec![(variables.cap_pro.var(key), 1.0)];
            let vintages = alive_vintages(model, key.year, |built| {
                let vintage = ProcessKey::new(built, &key.site, &key.process);
                let process = model.processes.get(&vintage)?;
                Some((vintage, process.depreciation))
            });
            terms.extend(
                vintages
                    .iter()
                    .map(|vintage| (variables.cap_pro_new.var(vintage), -1.0)),
            );
            Some(Constraint::eq(terms, model.processes[key].inst_cap))
        },
    );

    let input_keys: Vec<_> = opt.variables.e_pro_in.keys().cloned().collect();
    opt.add_constraints("def_process_input", input_keys, |variables, key| {
        let ratio = model.flows.ratios(FlowDirection::In)
            [&(key.key.year, key.key.process.clone(), key.key.commodity.clone())];
        let tau = variables
            .tau_pro
            .var(&Timed::new(key.t, key.key.process_key()));
        Some(Constraint::eq(
            vec![(variables.e_pro_in.var(key), 1.0), (tau, -ratio)],
            0.0,
        ))
    });

    let output_keys: Vec<_> = opt.variables.e_pro_out.keys().cloned().collect();
    opt.add_constraints("def_process_output", output_keys, |variables, key| {
        let ratio = model.flows.ratios(FlowDirection::Out)
            [&(key.key.year, key.key.process.clone(), key.key.commodity.clone())];
        let tau = variables
            .tau_pro
            .var(&Timed::new(key.t, key.key.process_key()));
        Some(Constraint::eq(
            vec![(variables.e_pro_out.var(key), 1.0), (tau, -ratio)],
            0.0,
        ))
    });

    // Intermittent inputs may be curtailed, so the input is limited rather than fixed
    let supim_keys: Vec<_> = opt
        .variables
        .e_pro_in
        .keys()
        .filter(|key| {
            let com = CommodityKey::new(key.key.year, &key.key.site, &key.key.commodity);
            model.commodity_type(&com) == Some(CommodityType::SupIm)
        })
        .cloned()
        .collect();
    opt.add_constraints("def_intermittent_supply", supim_keys, |variables, key| {
        let supim = model
            .supim
            .get(&key.key.site, &key.key.commodity, key.key.year, key.t);
        let cap = variables.cap_pro.var(&key.key.process_key());
        Some(Constraint::le(
            vec![
                (variables.e_pro_in.var(key), 1.0),
                (cap, -supim * model.dt()),
            ],
            0.0,
        ))
    });

    let tau_keys: Vec<_> = opt.variables.tau_pro.keys().cloned().collect();
    opt.add_constraints(
        "res_process_throughput_by_capacity",
        tau_keys,
        |variables, key| {
            Some(Constraint::le(
                vec![
                    (variables.tau_pro.var(key), 1.0),
                    (variables.cap_pro.var(&key.key), -model.dt()),
                ],
                0.0,
            ))
        },
    )
}

/// Add transmission capacity, loss and symmetry constraints
fn add_transmission_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> TransmissionInputKeys {
    let line_keys: Vec<_> = model.transmissions.keys().cloned().collect();
    opt.add_constraints(
        "def_transmission_capacity",
        line_keys.clone(),
        |variables, key| {
            let mut terms = vec![(variables.cap_tra.var(key), 1.0)];
            let vintages = alive_vintages(model, key.year, |built| {
                let vintage = TransmissionKey {
                    year: built,
                    ..key.clone()
                };
                let tra = model.transmissions.get(&vintage)?;
                Some((vintage, tra.depreciation))
            });
            terms.extend(
                vintages
                    .iter()
                    .map(|vintage| (variables.cap_tra_new.var(vintage), -1.0)),
            );
            Some(Constraint::eq(terms, model.transmissions[key].inst_cap))
        },
    );

    let flow_keys: Vec<_> = opt.variables.e_tra_in.keys().cloned().collect();
    opt.add_constraints(
        "def_transmission_output",
        flow_keys.clone(),
        |variables, key| {
            let eff = model.transmissions[&key.key].eff;
            Some(Constraint::eq(
                vec![
                    (variables.e_tra_out.var(key), 1.0),
                    (variables.e_tra_in.var(key), -eff),
                ],
                0.0,
            ))
        },
    );

    let input_keys = opt.add_constraints(
        "res_transmission_input_by_capacity",
        flow_keys,
        |variables, key| {
            Some(Constraint::le(
                vec![
                    (variables.e_tra_in.var(key), 1.0),
                    (variables.cap_tra.var(&key.key), -model.dt()),
                ],
                0.0,
            ))
        },
    );

    // Both directions of a line have the same capacity
    let symmetric = line_keys
        .into_iter()
        .filter(|key| key.site_in < key.site_out);
    opt.add_constraints("res_transmission_symmetry", symmetric, |variables, key| {
        let reverse = variables.cap_tra.get(&key.reverse())?;
        Some(Constraint::eq(
            vec![(variables.cap_tra.var(key), 1.0), (reverse, -1.0)],
            0.0,
        ))
    });

    input_keys
}

/// Add storage capacity, state and power constraints
fn add_storage_constraints(opt: &mut OptimisationModel, model: &Model) {
    let storage_keys: Vec<_> = model.storages.keys().cloned().collect();
    let vintages_of = |key: &StorageKey| {
        alive_vintages(model, key.year, |built| {
            let vintage = StorageKey {
                year: built,
                ..key.clone()
            };
            let storage = model.storages.get(&vintage)?;
            Some((vintage, storage.depreciation))
        })
    };

    opt.add_constraints(
        "def_storage_capacity",
        storage_keys.clone(),
        |variables, key| {
            let mut terms = vec![(variables.cap_sto_c.var(key), 1.0)];
            terms.extend(
                vintages_of(key)
                    .iter()
                    .map(|vintage| (variables.cap_sto_c_new.var(vintage), -1.0)),
            );
            Some(Constraint::eq(terms, model.storages[key].inst_cap_c))
        },
    );
    opt.add_constraints(
        "def_storage_power",
        storage_keys.clone(),
        |variables, key| {
            let mut terms = vec![(variables.cap_sto_p.var(key), 1.0)];
            terms.extend(
                vintages_of(key)
                    .iter()
                    .map(|vintage| (variables.cap_sto_p_new.var(vintage), -1.0)),
            );
            Some(Constraint::eq(terms, model.storages[key].inst_cap_p))
        },
    );

    let flow_keys: Vec<_> = opt.variables.e_sto_in.keys().cloned().collect();
    opt.add_constraints("def_storage_state", flow_keys.clone(), |variables, key| {
        let storage = &model.storages[&key.key];
        let previous = Timed::new(key.t - 1, key.key.clone());
        Some(Constraint::eq(
            vec![
                (variables.e_sto_con.var(key), 1.0),
                (variables.e_sto_con.var(&previous), -1.0),
                (variables.e_sto_in.var(key), -storage.eff_in),
                (variables.e_sto_out.var(key), 1.0 / storage.eff_out),
            ],
            0.0,
        ))
    });
    opt.add_constraints(
        "res_storage_input_by_power",
        flow_keys.clone(),
        |variables, key| {
            Some(Constraint::le(
                vec![
                    (variables.e_sto_in.var(key), 1.0),
                    (variables.cap_sto_p.var(&key.key), -model.dt()),
                ],
                0.0,
            ))
        },
    );
    opt.add_constraints(
        "res_storage_output_by_power",
        flow_keys,
        |variables, key| {
            Some(Constraint::le(
                vec![
                    (variables.e_sto_out.var(key), 1.0),
                    (variables.cap_sto_p.var(&key.key), -model.dt()),
                ],
                0.0,
            ))
        },
    );

    let content_keys: Vec<_> = opt.variables.e_sto_con.keys().cloned().collect();
    opt.add_constraints(
        "res_storage_state_by_capacity",
        content_keys,
        |variables, key| {
            Some(Constraint::le(
                vec![
                    (variables.e_sto_con.var(key), 1.0),
                    (variables.cap_sto_c.var(&key.key), -1.0),
                ],
                0.0,
            ))
        },
    );

    let t0 = model.initial_timestep();
    let end = *model.timesteps().end();
    opt.add_constraints(
        "res_initial_storage_state",
        storage_keys.clone(),
        |variables, key| {
            let init = model.storages[key].init?;
            Some(Constraint::eq(
                vec![
                    (variables.e_sto_con.var(&Timed::new(t0, key.clone())), 1.0),
                    (variables.cap_sto_c.var(key), -init),
                ],
                0.0,
            ))
        },
    );
    opt.add_constraints(
        "res_storage_state_cyclicity",
        storage_keys,
        |variables, key| {
            Some(Constraint::ge(
                vec![
                    (variables.e_sto_con.var(&Timed::new(end, key.clone())), 1.0),
                    (variables.e_sto_con.var(&Timed::new(t0, key.clone())), -1.0),
                ],
                0.0,
            ))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;

    #[test]
    fn test_zip_duals() {
        let keys = KeysWithOffset {
            offset: 1,
            keys: vec!["a", "b"],
        };
        let zipped: Vec<_> = keys.zip_duals(&[0.0, 1.0, 2.0, 3.0]).collect();
        assert_eq!(zipped, [(&"a", 1.0), (&"b", 2.0)]);
    }

    #[test]
    #[should_panic(expected = "Bad constraint keys: dual rows out of range")]
    fn test_zip_duals_out_of_range() {
        let keys = KeysWithOffset {
            offset: 2,
            keys: vec!["a", "b"],
        };
        keys.zip_duals(&[0.0, 1.0, 2.0]).for_each(drop);
    }

    #[rstest]
    fn test_base_constraint_blocks(model: Model) {
        let opt = OptimisationModel::new(&model);
        let n_timesteps = model.timesteps().count();

        assert_eq!(
            opt.num_constraints("def_process_capacity"),
            model.processes.len()
        );
        assert_eq!(
            opt.num_constraints("res_process_throughput_by_capacity"),
            model.processes.len() * n_timesteps
        );
        assert_eq!(opt.base_keys.throughput.len(), model.processes.len() * n_timesteps);

        // Env and SupIm commodities are never balanced
        assert!(opt.base_keys.vertex.keys().iter().all(|key| {
            !matches!(
                model.commodity_type(&key.key),
                Some(CommodityType::Env | CommodityType::SupIm)
            )
        }));

        // One symmetry constraint per pair of directions
        assert_eq!(
            opt.num_constraints("res_transmission_symmetry") * 2,
            model.transmissions.len()
        );
        assert_eq!(
            opt.num_constraints("res_storage_state_by_capacity"),
            model.storages.len() * (n_timesteps + 1)
        );
    }

    #[rstest]
    fn test_alive_vintages(model: Model) {
        // Everything in the demo lives for more than five years
        let key = model
            .processes
            .keys()
            .find(|key| key.year == 2035)
            .unwrap();
        let vintages = alive_vintages(&model, key.year, |built| {
            let vintage = ProcessKey::new(built, &key.site, &key.process);
            let process = model.processes.get(&vintage)?;
            Some((vintage, process.depreciation))
        });
        assert_eq!(vintages.len(), 2);
        assert_eq!(vintages.last(), Some(key));
    }
}
