//! Microgrid dispatch LP
//!
//! For every step `t` of the horizon:
//! - `Pimp[t] >= 0`, `Pexp[t] >= 0` grid exchange (optionally capped)
//! - `C[t], D[t] in [0, power_limit]` battery charge / discharge
//! - `SoC[t] in [0, capacity]`
//!
//! Rows:
//! - `balance_t`: `load[t] == pv[t] + D[t] + Pimp[t] - C[t] - Pexp[t]`
//! - `soc_t`: `SoC[t] == SoC[t-1] + eff*C[t] - D[t]/eff` (with `SoC[-1]` the initial charge)
//!
//! Objective: `min sum_t price_import*Pimp[t] - price_export*Pexp[t]`.
//!
//! Charging loses energy at `eff`, discharging at `1/eff`. Simultaneous import
//! and export is not excluded; this is the pure LP relaxation.

use crate::domain::{Dataset, Dispatch};

use super::model::{LinearProgram, Sense, VarId};

/// Variable handles per time step.
#[derive(Debug, Clone)]
pub struct StepVars {
    pub grid_import: Vec<VarId>,
    pub grid_export: Vec<VarId>,
    pub charge: Vec<VarId>,
    pub discharge: Vec<VarId>,
    pub soc: Vec<VarId>,
}

#[derive(Debug, Clone)]
pub struct MicrogridModel {
    pub lp: LinearProgram,
    pub vars: StepVars,
}

impl MicrogridModel {
    pub fn build(data: &Dataset) -> Self {
        let h = data.horizon;
        let eff = data.battery_efficiency;
        let pmax = data.battery_power_limit;
        let cap = data.battery_capacity;
        let mut lp = LinearProgram::new();

        let grid_import: Vec<VarId> = (0..h)
            .map(|t| {
                lp.add_var(
                    format!("Pimp_{t}"),
                    0.0,
                    data.import_limit.unwrap_or(f64::INFINITY),
                )
            })
            .collect();
        let grid_export: Vec<VarId> = (0..h)
            .map(|t| {
                lp.add_var(
                    format!("Pexp_{t}"),
                    0.0,
                    data.export_limit.unwrap_or(f64::INFINITY),
                )
            })
            .collect();
        let charge: Vec<VarId> = (0..h).map(|t| lp.add_var(format!("C_{t}"), 0.0, pmax)).collect();
        let discharge: Vec<VarId> =
            (0..h).map(|t| lp.add_var(format!("D_{t}"), 0.0, pmax)).collect();
        let soc: Vec<VarId> = (0..h).map(|t| lp.add_var(format!("SoC_{t}"), 0.0, cap)).collect();

        // D + Pimp - C - Pexp == load - pv
        for t in 0..h {
            lp.add_constraint(
                format!("balance_{t}"),
                vec![
                    (discharge[t], 1.0),
                    (grid_import[t], 1.0),
                    (charge[t], -1.0),
                    (grid_export[t], -1.0),
                ],
                Sense::Eq,
                data.load[t] - data.pv[t],
            );
        }

        // SoC[t] - SoC[t-1] - eff*C + D/eff == 0, with SoC[-1] moved to the rhs
        for t in 0..h {
            let mut terms = vec![(soc[t], 1.0), (charge[t], -eff), (discharge[t], 1.0 / eff)];
            let rhs = if t == 0 {
                data.initial_soc()
            } else {
                terms.push((soc[t - 1], -1.0));
                0.0
            };
            lp.add_constraint(format!("soc_{t}"), terms, Sense::Eq, rhs);
        }

        let objective = (0..h)
            .flat_map(|t| {
                [
                    (grid_import[t], data.price_import),
                    (grid_export[t], -data.price_export),
                ]
            })
            .collect();
        lp.set_objective(objective);

        Self {
            lp,
            vars: StepVars {
                grid_import,
                grid_export,
                charge,
                discharge,
                soc,
            },
        }
    }

    pub fn dispatch(&self, values: &[f64]) -> Dispatch {
        let pick = |ids: &[VarId]| ids.iter().map(|v| values[v.0]).collect::<Vec<f64>>();
        Dispatch {
            grid_import: pick(&self.vars.grid_import),
            grid_export: pick(&self.vars.grid_export),
            charge: pick(&self.vars.charge),
            discharge: pick(&self.vars.discharge),
            soc: pick(&self.vars.soc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dimensions_and_names() {
        let data = Dataset::default();
        let model = MicrogridModel::build(&data);
        assert_eq!(model.lp.variables().len(), 5 * 24);
        assert_eq!(model.lp.constraints().len(), 2 * 24);
        assert_eq!(model.lp.constraints()[0].name, "balance_0");
        assert_eq!(model.lp.constraints()[24].name, "soc_0");
        assert_eq!(model.lp.objective().len(), 2 * 24);
        assert!(model.lp.check().is_ok());
    }

    #[test]
    fn test_soc_rows_keep_efficiency_asymmetry() {
        let data = Dataset::default();
        let model = MicrogridModel::build(&data);
        let first = &model.lp.constraints()[24];
        assert_eq!(first.rhs, 2.5);
        assert_eq!(first.terms.len(), 3);
        assert!(first.terms.contains(&(model.vars.charge[0], -0.95)));
        assert!(first.terms.contains(&(model.vars.discharge[0], 1.0 / 0.95)));

        let later = &model.lp.constraints()[30];
        assert_eq!(later.rhs, 0.0);
        assert!(later.terms.contains(&(model.vars.soc[5], -1.0)));
    }

    #[test]
    fn test_balance_rhs_is_net_demand() {
        let data = Dataset::default();
        let model = MicrogridModel::build(&data);
        let noon = &model.lp.constraints()[9];
        assert!((noon.rhs - (2.0 - 2.2)).abs() < 1e-12);
    }

    #[test]
    fn test_grid_limits_become_upper_bounds() {
        let data = Dataset {
            import_limit: Some(0.0),
            ..Dataset::default()
        };
        let model = MicrogridModel::build(&data);
        let pimp = &model.lp.variables()[model.vars.grid_import[0].0];
        assert_eq!(pimp.upper, 0.0);
        let pexp = &model.lp.variables()[model.vars.grid_export[0].0];
        assert!(pexp.upper.is_infinite());
    }

    #[test]
    fn test_zero_efficiency_produces_malformed_model() {
        let data = Dataset {
            battery_efficiency: 0.0,
            ..Dataset::default()
        };
        let model = MicrogridModel::build(&data);
        assert!(model.lp.check().is_err());
    }
}
