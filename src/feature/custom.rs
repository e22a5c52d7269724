//! Regional policy constraints: capacity freezes, renewable share caps, capacity factors and
//! minimum domestic generation.
use crate::commodity::{CommodityKey, CommodityType};
use crate::model::{HOURS_PER_YEAR, Model};
use crate::optimisation::{Constraint, KeysWithOffset, OptimisationModel, Timed};
use crate::process::ProcessKey;
use log::debug;

/// The keys of the custom constraints added to a model
pub struct CustomConstraintKeys {
    /// New capacity forbidden for a process after a given year
    pub no_more_new_capacity: KeysWithOffset<ProcessKey>,
    /// Renewable share cap per support timeframe (absent without demand commodities)
    pub vre_limit: Option<KeysWithOffset<u32>>,
    /// Annual throughput limited by capacity factor
    pub throughput_by_capacity_factor: KeysWithOffset<ProcessKey>,
    /// Minimum domestic generation (absent if no commodity has a minimum ratio)
    pub import_limit: Option<KeysWithOffset<CommodityKey>>,
}

/// Add the custom constraints to the problem.
///
/// The process subject to the capacity freeze, the year after which it applies and the renewable
/// processes and share are taken from the model parameters.
pub fn add_custom_constraints(opt: &mut OptimisationModel, model: &Model) -> CustomConstraintKeys {
    let no_more_new_capacity = add_no_more_new_capacity_constraints(opt, model);
    let vre_limit = add_vre_limit_constraints(opt, model);
    let throughput_by_capacity_factor = add_capacity_factor_constraints(opt, model);
    let import_limit = add_import_limit_constraints(opt, model);

    CustomConstraintKeys {
        no_more_new_capacity,
        vre_limit,
        throughput_by_capacity_factor,
        import_limit,
    }
}

/// `cap_pro_new <= 0` for the frozen process in every support timeframe after the cutoff year
fn add_no_more_new_capacity_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> KeysWithOffset<ProcessKey> {
    let params = &model.parameters.constraints;
    let index: Vec<_> = model
        .processes
        .keys()
        .filter(|key| {
            key.year > params.no_new_capacity_after && key.process == params.no_new_capacity_process
        })
        .cloned()
        .collect();

    opt.add_constraints("res_no_more_new_capacity", index, |variables, key| {
        Some(Constraint::le(
            vec![(variables.cap_pro_new.var(key), 1.0)],
            0.0,
        ))
    })
}

/// Total demand for demand commodities across all sites in a support timeframe
fn total_demand(model: &Model, year: u32) -> f64 {
    let demand_commodities = model.commodity_ids_of_type(CommodityType::Demand);
    model
        .site_tuples
        .iter()
        .filter(|(y, _)| *y == year)
        .flat_map(|(_, site)| {
            demand_commodities
                .iter()
                .map(move |commodity| (site, commodity))
        })
        .map(|(site, commodity)| {
            model
                .demand
                .total(site, commodity, year, model.timesteps())
        })
        .sum()
}

/// Output of renewable processes for demand commodities is limited to a share of total demand,
/// per support timeframe and across all sites
fn add_vre_limit_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> Option<KeysWithOffset<u32>> {
    let demand_commodities = model.commodity_ids_of_type(CommodityType::Demand);
    if demand_commodities.is_empty() {
        debug!("No demand commodities: renewable share limit omitted");
        return None;
    }

    let params = &model.parameters.constraints;
    let keys = opt.add_constraints("res_vre_limit", model.years.clone(), |variables, year| {
        let terms: Vec<_> = variables
            .e_pro_out
            .iter()
            .filter(|(key, _)| {
                key.key.year == *year
                    && params.vre_processes.contains(&key.key.process)
                    && demand_commodities.contains(&key.key.commodity)
            })
            .map(|(_, var)| (var, 1.0))
            .collect();
        if terms.is_empty() {
            return None;
        }

        let limit = params.vre_share_limit * total_demand(model, *year);
        Some(Constraint::le(terms, limit))
    });

    Some(keys)
}

/// `Σ_t tau_pro · weight <= 8760 · cap_factor · cap_pro` for processes with a capacity factor
/// below one
fn add_capacity_factor_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> KeysWithOffset<ProcessKey> {
    let index: Vec<_> = model
        .processes
        .iter()
        .filter(|(_, process)| process.cap_factor < 1.0)
        .map(|(key, _)| key.clone())
        .collect();

    opt.add_constraints(
        "res_throughput_by_capacity_factor",
        index,
        |variables, key| {
            let cap_factor = model.processes[key].cap_factor;
            let mut terms: Vec<_> = model
                .timesteps()
                .map(|t| {
                    let tau = variables.tau_pro.var(&Timed::new(t, key.clone()));
                    (tau, model.weight())
                })
                .collect();
            terms.push((
                variables.cap_pro.var(key),
                -HOURS_PER_YEAR * cap_factor,
            ));
            Some(Constraint::le(terms, 0.0))
        },
    )
}

/// Domestic generation of a demand commodity must cover a minimum share of the site's demand
fn add_import_limit_constraints(
    opt: &mut OptimisationModel,
    model: &Model,
) -> Option<KeysWithOffset<CommodityKey>> {
    if model
        .commodities
        .values()
        .all(|commodity| commodity.min_ratio.is_none())
    {
        return None;
    }

    let index: Vec<_> = model
        .commodities
        .iter()
        .filter(|(_, commodity)| {
            commodity.min_ratio.is_some() && commodity.kind == CommodityType::Demand
        })
        .map(|(key, _)| key.clone())
        .collect();

    let keys = opt.add_constraints("res_import_limit", index, |variables, key| {
        if !model.demand.contains(&key.site, &key.commodity) {
            return None;
        }

        let min_ratio = model.commodities[key].min_ratio?;
        let terms = variables
            .e_pro_out
            .iter()
            .filter(|(pc, _)| {
                pc.key.year == key.year
                    && pc.key.site == key.site
                    && pc.key.commodity == key.commodity
            })
            .map(|(_, var)| (var, 1.0))
            .collect();
        let demand = model
            .demand
            .total(&key.site, &key.commodity, key.year, model.timesteps());
        Some(Constraint::ge(terms, min_ratio * demand))
    });

    Some(keys)
}
