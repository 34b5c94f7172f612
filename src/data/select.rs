use ndarray::ArrayView2;

// ---------------------------------------------------------------------------
// Level selection: which eigenvalues a plotting caller asked for
// ---------------------------------------------------------------------------

/// Which energy levels to extract from an energy table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LevelSelection {
    /// Every level in the table.
    #[default]
    All,
    /// Levels `0..n`.
    First(usize),
    /// Exactly these levels, in this order.
    Indices(Vec<usize>),
}

impl LevelSelection {
    /// Resolve to concrete level indices for a table with `level_count`
    /// columns. Indices past the table are dropped.
    pub fn levels(&self, level_count: usize) -> Vec<usize> {
        match self {
            LevelSelection::All => (0..level_count).collect(),
            LevelSelection::First(n) => (0..(*n).min(level_count)).collect(),
            LevelSelection::Indices(idx) => {
                idx.iter().copied().filter(|&i| i < level_count).collect()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Curves handed to the plotting side
// ---------------------------------------------------------------------------

/// One energy level traced across the sweep: `[param_val, energy]` points.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: String,
    pub level: usize,
    pub points: Vec<[f64; 2]>,
}

/// Extract one curve per selected level.
///
/// `labels[k]` names the k-th selected curve; without a label the curve is
/// called `level <n>`. Rows past the end of `param_vals` are ignored.
pub fn energy_curves(
    param_vals: &[f64],
    energies: ArrayView2<'_, f64>,
    selection: &LevelSelection,
    labels: Option<&[String]>,
) -> Vec<Curve> {
    selection
        .levels(energies.ncols())
        .into_iter()
        .enumerate()
        .map(|(k, level)| {
            let label = labels
                .and_then(|l| l.get(k))
                .cloned()
                .unwrap_or_else(|| format!("level {level}"));
            let points = param_vals
                .iter()
                .zip(energies.column(level))
                .map(|(&p, &e)| [p, e])
                .collect();
            Curve {
                label,
                level,
                points,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_levels() {
        assert_eq!(LevelSelection::All.levels(3), vec![0, 1, 2]);
        assert_eq!(LevelSelection::First(2).levels(3), vec![0, 1]);
        assert_eq!(LevelSelection::First(10).levels(3), vec![0, 1, 2]);
        assert_eq!(LevelSelection::Indices(vec![2, 7, 0]).levels(3), vec![2, 0]);
    }

    #[test]
    fn test_energy_curves() {
        let energies = array![[0.0, 1.0, 4.0], [0.5, 1.5, 3.0]];
        let labels = vec!["ground".to_string()];
        let curves = energy_curves(
            &[-1.0, 1.0],
            energies.view(),
            &LevelSelection::Indices(vec![0, 2]),
            Some(&labels),
        );
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].label, "ground");
        assert_eq!(curves[0].points, vec![[-1.0, 0.0], [1.0, 0.5]]);
        assert_eq!(curves[1].label, "level 2");
        assert_eq!(curves[1].points, vec![[-1.0, 4.0], [1.0, 3.0]]);
    }

    #[test]
    fn test_short_param_vals_truncate_curves() {
        let energies = array![[0.0], [1.0], [2.0]];
        let curves = energy_curves(&[0.0, 1.0], energies.view(), &LevelSelection::All, None);
        assert_eq!(curves[0].points.len(), 2);
    }
}
