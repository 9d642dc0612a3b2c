use super::milp::{Milp, VarId, VarKind};
use std::ops::Range;

/// Builds a block of variables shaped like the index set it is implemented
/// for: a `usize` gives a `Vec`, a pair of them a `Vec<Vec<..>>`.
pub trait AddVars {
    type Out;

    /// Create a variable for any kind and bounds
    fn vars(
        &self,
        model: &mut Milp,
        base_name: &str,
        kind: VarKind,
        bounds: &Range<f64>,
    ) -> Self::Out;

    /// Binary variables
    fn binary(&self, model: &mut Milp, base_name: &str) -> Self::Out
    where
        Self: Sized,
    {
        self.vars(model, base_name, VarKind::Binary, &(0.0..1.0))
    }

    /// Continuous non-negative variables
    fn cont(&self, model: &mut Milp, base_name: &str) -> Self::Out
    where
        Self: Sized,
    {
        self.vars(model, base_name, VarKind::Continuous, &(0.0..f64::INFINITY))
    }
}

impl AddVars for usize {
    type Out = Vec<VarId>;

    fn vars(
        &self,
        model: &mut Milp,
        base_name: &str,
        kind: VarKind,
        bounds: &Range<f64>,
    ) -> Self::Out {
        let mut vec = Vec::with_capacity(*self);
        for i in 0..*self {
            vec.push(model.add_var(
                format!("{}_{}", base_name, i),
                kind,
                bounds.start,
                bounds.end,
            ));
        }

        vec
    }
}

impl AddVars for (usize, usize) {
    type Out = Vec<<usize as AddVars>::Out>;

    fn vars(
        &self,
        model: &mut Milp,
        base_name: &str,
        kind: VarKind,
        bounds: &Range<f64>,
    ) -> Self::Out {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(
                self.1
                    .vars(model, &format!("{}_{}", base_name, i), kind, bounds),
            )
        }

        out
    }
}

/// Reads solved values back into the shape of a variable block.
pub trait ConvertVars {
    type Out;

    fn convert(&self, assignment: &[f64]) -> Self::Out;
}

impl ConvertVars for VarId {
    type Out = f64;

    fn convert(&self, assignment: &[f64]) -> Self::Out {
        assignment[*self]
    }
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert(&self, assignment: &[f64]) -> Self::Out {
        self.iter().map(|e| e.convert(assignment)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_shaped_by_their_index_set() {
        let mut model = Milp::new("test");
        let x = (2usize, 3usize).cont(&mut model, "x");
        let y = 2usize.binary(&mut model, "y");

        assert_eq!(x.len(), 2);
        assert!(x.iter().all(|row| row.len() == 3));
        assert_eq!(y.len(), 2);
        assert_eq!(model.variables().len(), 8);
        assert_eq!(model.variables()[x[1][2]].name, "x_1_2");
        assert_eq!(model.variables()[y[1]].kind, VarKind::Binary);
    }

    #[test]
    fn convert_reads_back_block_values() {
        let mut model = Milp::new("test");
        let x = (2usize, 2usize).cont(&mut model, "x");

        let assignment = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(x.convert(&assignment), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }
}
