//! Static-flow residuals and their analytic partials.

use super::{FlowArea, FlowTarget, StaticInputs, StaticMode, StaticRow, StaticState, StaticVar};
use crate::block::{BlockLayout, BlockMatrix};
use crate::error::{SolverError, SolverResult};
use crate::guarded::{checked_div, checked_sqrt};
use ceq_core::constants::R_UNIVERSAL_SI;

/// Mach numbers below this are stagnant flow with an unbounded area.
pub const STAGNANT_MACH: f64 = 1e-16;

/// Residuals of the four static-flow equations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticResiduals {
    /// `(ht_calc - ht) / ht`
    pub ps: f64,
    pub v: f64,
    pub vsonic: f64,
    /// Area residual (Mach mode) or Mach residual (area mode)
    pub free: f64,
}

impl StaticResiduals {
    pub fn to_array(&self) -> [f64; 4] {
        [self.ps, self.v, self.vsonic, self.free]
    }
}

/// Explicit quantities implied by the inputs alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowKinematics {
    pub vsonic: f64,
    pub mach: f64,
    pub v: f64,
    pub area: FlowArea,
}

/// `sqrt(gamma R n_moles Ts)`, failing with the offending inputs.
pub fn speed_of_sound(gamma: f64, n_moles: f64, ts: f64) -> SolverResult<f64> {
    checked_sqrt("speed of sound", gamma * R_UNIVERSAL_SI * n_moles * ts, || {
        format!("gamma={gamma}, n_moles={n_moles}, Ts={ts}")
    })
}

/// Speed of sound, Mach number, velocity and area for the configured mode.
pub fn kinematics(mode: StaticMode, inputs: &StaticInputs) -> SolverResult<FlowKinematics> {
    let vsonic = speed_of_sound(inputs.gamma, inputs.n_moles, inputs.ts)?;
    match (mode, inputs.target) {
        (StaticMode::Mach, FlowTarget::Mach(mach)) => {
            let area = if mach < STAGNANT_MACH || inputs.w == 0.0 {
                FlowArea::Unbounded
            } else {
                FlowArea::Finite(checked_div("area", inputs.w, inputs.rho * vsonic * mach, || {
                    format!("W={}, rho={}, Vsonic={vsonic}, MN={mach}", inputs.w, inputs.rho)
                })?)
            };
            Ok(FlowKinematics {
                vsonic,
                mach,
                v: mach * vsonic,
                area,
            })
        }
        (StaticMode::Area, FlowTarget::Area(area)) => {
            let mach = match area {
                FlowArea::Unbounded => 0.0,
                FlowArea::Finite(a) => checked_div("Mach number", inputs.w, inputs.rho * vsonic * a, || {
                    format!("W={}, rho={}, Vsonic={vsonic}, area={a}", inputs.w, inputs.rho)
                })?,
            };
            Ok(FlowKinematics {
                vsonic,
                mach,
                v: mach * vsonic,
                area,
            })
        }
        (mode, target) => Err(target_mismatch(mode, target)),
    }
}

pub(crate) fn target_mismatch(mode: StaticMode, target: FlowTarget) -> SolverError {
    SolverError::invalid(format!(
        "{target:?} target given to a static-flow resolver in {mode} mode"
    ))
}

/// Residuals at `state` for the given inputs.
pub fn evaluate(mode: StaticMode, inputs: &StaticInputs, state: &StaticState) -> SolverResult<StaticResiduals> {
    let k = kinematics(mode, inputs)?;
    let ht_calc = inputs.hs + 0.5 * k.mach * k.mach * inputs.gamma * R_UNIVERSAL_SI * inputs.ts * inputs.n_moles;
    let ps = checked_div("total enthalpy residual", ht_calc - inputs.ht, inputs.ht, || {
        format!("ht={}, hs={}", inputs.ht, inputs.hs)
    })?;

    let free = match mode {
        StaticMode::Mach => match k.area {
            FlowArea::Finite(a) => a - state.free,
            FlowArea::Unbounded => 0.0,
        },
        StaticMode::Area => k.mach - state.free,
    };

    Ok(StaticResiduals {
        ps,
        v: k.v - state.v,
        vsonic: k.vsonic - state.vsonic,
        free,
    })
}

/// Row layout of the static partials.
pub fn row_layout() -> BlockLayout<StaticRow> {
    BlockLayout::new(&[
        (StaticRow::Ps, 1),
        (StaticRow::V, 1),
        (StaticRow::Vsonic, 1),
        (StaticRow::Free, 1),
    ])
}

/// Column layout of the static partials: the four states, then the inputs.
pub fn column_layout() -> BlockLayout<StaticVar> {
    BlockLayout::new(&StaticVar::ALL.map(|v| (v, 1)))
}

/// Analytic partials of every residual w.r.t. every state and input.
pub fn partials(mode: StaticMode, inputs: &StaticInputs) -> SolverResult<BlockMatrix<StaticRow, StaticVar>> {
    let k = kinematics(mode, inputs)?;
    let mut jac = BlockMatrix::zeros(row_layout(), column_layout());
    let mut set = |row: StaticRow, var: StaticVar, value: f64| {
        if let Some(mut b) = jac.block_mut(row, var) {
            b[(0, 0)] = value;
        }
    };

    let StaticInputs {
        ts,
        ht,
        hs,
        n_moles,
        gamma,
        w,
        rho,
        ..
    } = *inputs;
    let vs = k.vsonic;
    let mach = k.mach;
    let half_m2 = 0.5 * mach * mach;
    let rt_nm = R_UNIVERSAL_SI * ts * n_moles;
    let ht_calc = hs + half_m2 * gamma * rt_nm;

    set(StaticRow::Ps, StaticVar::Ht, -ht_calc / (ht * ht));
    set(StaticRow::Ps, StaticVar::Hs, 1.0 / ht);

    set(StaticRow::Vsonic, StaticVar::Gamma, vs / (2.0 * gamma));
    set(StaticRow::Vsonic, StaticVar::NMoles, vs / (2.0 * n_moles));
    set(StaticRow::Vsonic, StaticVar::Ts, vs / (2.0 * ts));
    set(StaticRow::Vsonic, StaticVar::VsonicState, -1.0);
    set(StaticRow::V, StaticVar::VState, -1.0);
    set(StaticRow::Free, StaticVar::FreeState, -1.0);

    match mode {
        StaticMode::Mach => {
            set(StaticRow::Ps, StaticVar::Target, mach * gamma * rt_nm / ht);
            set(StaticRow::Ps, StaticVar::NMoles, half_m2 * gamma * R_UNIVERSAL_SI * ts / ht);
            set(StaticRow::Ps, StaticVar::Gamma, half_m2 * rt_nm / ht);
            set(StaticRow::Ps, StaticVar::Ts, half_m2 * gamma * R_UNIVERSAL_SI * n_moles / ht);

            set(StaticRow::V, StaticVar::Target, vs);
            set(StaticRow::V, StaticVar::Ts, mach * vs / (2.0 * ts));
            set(StaticRow::V, StaticVar::NMoles, mach * vs / (2.0 * n_moles));
            set(StaticRow::V, StaticVar::Gamma, mach * vs / (2.0 * gamma));

            if let FlowArea::Finite(a) = k.area {
                set(StaticRow::Free, StaticVar::W, 1.0 / (rho * vs * mach));
                set(StaticRow::Free, StaticVar::Rho, -a / rho);
                set(StaticRow::Free, StaticVar::Target, -a / mach);
                set(StaticRow::Free, StaticVar::Gamma, -a / (2.0 * gamma));
                set(StaticRow::Free, StaticVar::NMoles, -a / (2.0 * n_moles));
                set(StaticRow::Free, StaticVar::Ts, -a / (2.0 * ts));
            }
        }
        StaticMode::Area => {
            if let FlowArea::Finite(a) = k.area {
                // V = W / (rho A) does not depend on the speed of sound.
                let v = k.v;
                set(StaticRow::Ps, StaticVar::W, v / (rho * a) / ht);
                set(StaticRow::Ps, StaticVar::Rho, -v * v / rho / ht);
                set(StaticRow::Ps, StaticVar::Target, -v * v / a / ht);

                set(StaticRow::V, StaticVar::W, 1.0 / (rho * a));
                set(StaticRow::V, StaticVar::Rho, -v / rho);
                set(StaticRow::V, StaticVar::Target, -v / a);

                set(StaticRow::Free, StaticVar::W, 1.0 / (rho * vs * a));
                set(StaticRow::Free, StaticVar::Rho, -mach / rho);
                set(StaticRow::Free, StaticVar::Target, -mach / a);
                set(StaticRow::Free, StaticVar::Gamma, -mach / (2.0 * gamma));
                set(StaticRow::Free, StaticVar::NMoles, -mach / (2.0 * n_moles));
                set(StaticRow::Free, StaticVar::Ts, -mach / (2.0 * ts));
            }
        }
    }

    if !jac.matrix().iter().all(|v| v.is_finite()) {
        return Err(SolverError::Domain {
            what: "static-flow partials",
            context: format!("gamma={gamma}, n_moles={n_moles}, Ts={ts}, ht={ht}, rho={rho}, W={w}"),
        });
    }
    Ok(jac)
}
