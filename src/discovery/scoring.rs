//! Hunter scoring: Mode A's profit-centric formula and Mode B's three-axis
//! formula (§4.5 Scoring). Both take plain numeric inputs and return a score
//! in `[0, 100]`; callers own clamping/rounding for display.

/// Piecewise-linear helper: 0 below `floor`, 1.0 at/above `ceiling`, linear between.
fn linear_ramp(value: f64, floor: f64, ceiling: f64) -> f64 {
    if ceiling <= floor {
        return if value >= ceiling { 1.0 } else { 0.0 };
    }
    ((value - floor) / (ceiling - floor)).clamp(0.0, 1.0)
}

/// Inputs for Mode A's profit-centric score.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeAInputs {
    pub win_rate_pct: f64,
    pub avg_roi_pct: f64,
    /// `f64::INFINITY` is accepted and treated as the R=1.0 ceiling.
    pub pnl_ratio: f64,
    pub max_roi_30d_pct: f64,
    pub avg_roi_ceiling_pct: f64,
    pub pnl_ratio_ceiling: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModeAScore {
    pub total: f64,
    pub win_rate_component: f64,
    pub roi_component: f64,
    pub pnl_ratio_component: f64,
    pub roi_bucket_multiplier: f64,
}

/// `score = 30*H + 40*P + 30*R`, scaled by the `max_roi_30d` bucket.
pub fn score_mode_a(inputs: ModeAInputs) -> ModeAScore {
    let h = linear_ramp(inputs.win_rate_pct, 20.0, 60.0);
    let p = linear_ramp(inputs.avg_roi_pct, 0.0, inputs.avg_roi_ceiling_pct);
    let r = if inputs.pnl_ratio.is_infinite() {
        1.0
    } else {
        linear_ramp(inputs.pnl_ratio, 1.0, inputs.pnl_ratio_ceiling)
    };

    let bucket = if inputs.max_roi_30d_pct >= 200.0 {
        1.0
    } else if inputs.max_roi_30d_pct >= 100.0 {
        0.9
    } else if inputs.max_roi_30d_pct >= 50.0 {
        0.75
    } else {
        0.5
    };

    let raw = 30.0 * h + 40.0 * p + 30.0 * r;
    ModeAScore {
        total: (raw * bucket).clamp(0.0, 100.0),
        win_rate_component: h,
        roi_component: p,
        pnl_ratio_component: r,
        roi_bucket_multiplier: bucket,
    }
}

/// Inputs for Mode B's three-axis score.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeBInputs {
    pub pnl_ratio: f64,
    pub avg_roi_pct: f64,
    pub max_roi_pct: f64,
    pub had_single_loss_over_99pct: bool,
    pub win_rate_pct: f64,
    pub tx_per_day: f64,
    pub dust_ratio_pct: f64,
    pub avg_hold_secs: f64,
    pub profitable_avg_hold_secs: f64,
    pub loss_avg_hold_secs: f64,
    pub closed_ratio_pct: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModeBScore {
    pub total: f64,
    pub profit_dim: f64,
    pub persist_dim: f64,
    pub authenticity_dim: f64,
}

fn profit_dim(i: &ModeBInputs) -> f64 {
    let mut dim = (12.5 * i.pnl_ratio).min(25.0) + (i.avg_roi_pct / 5.0).min(10.0) + (i.max_roi_pct / 10.0).min(10.0);
    if i.had_single_loss_over_99pct {
        dim -= 10.0;
    }
    dim.max(0.0)
}

fn persist_dim(i: &ModeBInputs) -> f64 {
    let win_rate_component = if i.win_rate_pct < 40.0 {
        10.0 * i.win_rate_pct / 40.0
    } else if i.win_rate_pct < 80.0 {
        10.0 + 20.0 * (i.win_rate_pct - 40.0) / 40.0
    } else {
        30.0
    };

    let activity = if i.tx_per_day >= 1.0 { 5.0 } else { 0.0 };

    let dust_penalty = if i.dust_ratio_pct < 10.0 {
        0.0
    } else if i.dust_ratio_pct < 50.0 {
        5.0 + 15.0 * (i.dust_ratio_pct / 100.0 - 0.1) / 0.4
    } else {
        20.0
    };

    (win_rate_component + activity - dust_penalty).max(0.0)
}

fn authenticity_dim(i: &ModeBInputs) -> f64 {
    const ONE_DAY_SECS: f64 = 86_400.0;
    let hold_time = if i.avg_hold_secs <= ONE_DAY_SECS { 5.0 } else { 0.0 };

    let hold_ratio = if i.loss_avg_hold_secs > 0.0 && i.profitable_avg_hold_secs > 2.0 * i.loss_avg_hold_secs {
        10.0
    } else if i.profitable_avg_hold_secs > i.loss_avg_hold_secs {
        5.0
    } else {
        0.0
    };

    let closed_ratio = if i.closed_ratio_pct > 90.0 {
        5.0
    } else if i.closed_ratio_pct > 70.0 {
        3.0
    } else if i.closed_ratio_pct > 50.0 {
        1.0
    } else {
        0.0
    };

    hold_time + hold_ratio + closed_ratio
}

/// `score = profit_dim(45) + persist_dim(35) + authenticity_dim(20)`.
pub fn score_mode_b(inputs: ModeBInputs) -> ModeBScore {
    let profit = profit_dim(&inputs);
    let persist = persist_dim(&inputs);
    let authenticity = authenticity_dim(&inputs);
    ModeBScore {
        total: (profit + persist + authenticity).clamp(0.0, 100.0),
        profit_dim: profit,
        persist_dim: persist,
        authenticity_dim: authenticity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_a_zero_win_rate_zero_roi_zero_pnl_scores_zero() {
        let score = score_mode_a(ModeAInputs {
            win_rate_pct: 0.0,
            avg_roi_pct: 0.0,
            pnl_ratio: 0.0,
            max_roi_30d_pct: 0.0,
            avg_roi_ceiling_pct: 500.0,
            pnl_ratio_ceiling: 5.0,
        });
        assert_eq!(score.total, 0.0);
    }

    #[test]
    fn mode_a_infinite_pnl_ratio_treated_as_one() {
        let score = score_mode_a(ModeAInputs {
            win_rate_pct: 60.0,
            avg_roi_pct: 500.0,
            pnl_ratio: f64::INFINITY,
            max_roi_30d_pct: 200.0,
            avg_roi_ceiling_pct: 500.0,
            pnl_ratio_ceiling: 5.0,
        });
        assert_eq!(score.pnl_ratio_component, 1.0);
        assert_eq!(score.total, 100.0);
    }

    #[test]
    fn mode_a_roi_bucket_scales_down_below_200() {
        let base = ModeAInputs {
            win_rate_pct: 60.0,
            avg_roi_pct: 500.0,
            pnl_ratio: 5.0,
            max_roi_30d_pct: 200.0,
            avg_roi_ceiling_pct: 500.0,
            pnl_ratio_ceiling: 5.0,
        };
        let top = score_mode_a(base);
        let mid = score_mode_a(ModeAInputs { max_roi_30d_pct: 100.0, ..base });
        let low = score_mode_a(ModeAInputs { max_roi_30d_pct: 50.0, ..base });
        assert!(top.total > mid.total);
        assert!(mid.total > low.total);
    }

    #[test]
    fn mode_b_single_catastrophic_loss_penalizes_profit_dim() {
        let base = ModeBInputs {
            pnl_ratio: 1.0,
            avg_roi_pct: 50.0,
            max_roi_pct: 50.0,
            had_single_loss_over_99pct: false,
            ..Default::default()
        };
        let clean = score_mode_b(base);
        let penalized = score_mode_b(ModeBInputs { had_single_loss_over_99pct: true, ..base });
        assert_eq!(clean.profit_dim - penalized.profit_dim, 10.0);
    }

    #[test]
    fn mode_b_dust_penalty_caps_at_twenty() {
        let inputs = ModeBInputs {
            win_rate_pct: 50.0,
            tx_per_day: 2.0,
            dust_ratio_pct: 90.0,
            ..Default::default()
        };
        let score = score_mode_b(inputs);
        // win_rate_component(15) + activity(5) - dust_penalty(20), clamped at 0
        assert_eq!(score.persist_dim, 0.0);
    }

    #[test]
    fn mode_b_hold_ratio_rewards_longer_winners() {
        let base = ModeBInputs {
            avg_hold_secs: 3600.0,
            profitable_avg_hold_secs: 100.0,
            loss_avg_hold_secs: 100.0,
            closed_ratio_pct: 0.0,
            ..Default::default()
        };
        let tied = score_mode_b(base);
        let double = score_mode_b(ModeBInputs { profitable_avg_hold_secs: 250.0, ..base });
        assert!(double.authenticity_dim > tied.authenticity_dim);
    }
}
