//! IR program definition

use super::instruction::{Opcode, Operand, Quadruple};

/// Complete IR program: an append-only quadruple sequence and the counters
/// that name its temporaries and labels
#[derive(Debug, Clone, Default)]
pub struct IrProgram {
    /// All quadruples in emission order
    quads: Vec<Quadruple>,
    /// Temporaries handed out so far
    temp_count: u32,
    /// Discard slots handed out so far
    discard_count: u32,
    /// Labels handed out so far
    label_count: u32,
}

impl IrProgram {
    /// Create a new empty IR program
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a quadruple and return its index (1-based, gap-free)
    pub fn push(
        &mut self,
        op: Opcode,
        arg1: Option<Operand>,
        arg2: Option<Operand>,
        result: Option<Operand>,
        line: usize,
    ) -> usize {
        let index = self.quads.len() + 1;
        self.quads.push(Quadruple {
            index,
            line,
            op,
            arg1,
            arg2,
            result,
        });
        index
    }

    /// Fresh temporary
    pub fn new_temp(&mut self) -> Operand {
        let temp = Operand::Temp(self.temp_count);
        self.temp_count += 1;
        temp
    }

    /// Fresh discard slot for an unused call result
    pub fn new_discard(&mut self) -> Operand {
        let discard = Operand::Discard(self.discard_count);
        self.discard_count += 1;
        discard
    }

    /// Fresh label
    pub fn new_label(&mut self) -> Operand {
        let label = Operand::Label(self.label_count);
        self.label_count += 1;
        label
    }

    /// Quadruples in order
    pub fn quads(&self) -> &[Quadruple] {
        &self.quads
    }

    /// Iterate over quadruples in order
    pub fn iter(&self) -> std::slice::Iter<'_, Quadruple> {
        self.quads.iter()
    }

    /// Number of quadruples
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// True if nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Number of temporaries allocated
    pub fn temp_count(&self) -> u32 {
        self.temp_count
    }

    /// Number of labels allocated
    pub fn label_count(&self) -> u32 {
        self.label_count
    }
}

impl<'a> IntoIterator for &'a IrProgram {
    type Item = &'a Quadruple;
    type IntoIter = std::slice::Iter<'a, Quadruple>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_start_at_one() {
        let mut ir = IrProgram::new();
        let t = ir.new_temp();
        assert_eq!(ir.push(Opcode::Assign, Some(Operand::Const(1)), None, Some(t), 3), 1);
        assert_eq!(ir.push(Opcode::Nop, None, None, None, 3), 2);
        assert_eq!(ir.quads()[1].index, 2);
    }

    #[test]
    fn test_counters_are_independent() {
        let mut ir = IrProgram::new();
        assert_eq!(ir.new_temp(), Operand::Temp(0));
        assert_eq!(ir.new_label(), Operand::Label(0));
        assert_eq!(ir.new_discard(), Operand::Discard(0));
        assert_eq!(ir.new_temp(), Operand::Temp(1));
        assert_eq!(ir.temp_count(), 2);
        assert_eq!(ir.label_count(), 1);
    }
}
