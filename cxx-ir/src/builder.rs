//! Per-function IR assembly: temporary allocation, scope-exit destructor
//! bookkeeping, and loop/switch contexts for `break`/`continue`.

use crate::opcode::{Instruction, Op, SehFilterKind};
use crate::value::{LabelId, Operand, TempVar, TempVarMeta, ValueCategory};
use cxx_ast::Symbol;

/// The finished per-function IR: instructions in program order plus the
/// temp metadata side table, consumed by `cxx-codegen`.
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: Symbol,
    pub instructions: Vec<Instruction>,
    /// Index 0 is an unused placeholder so `TempVar(n)` indexes directly.
    pub temps: Vec<TempVarMeta>,
    pub param_count: usize,
}

struct PendingDtor {
    object: Operand,
    ty: Symbol,
}

struct ScopeFrame {
    pending: Vec<PendingDtor>,
    /// SEH nesting depth (count of open `SehFinallyBegin`s) at scope entry,
    /// used so `Break`/`Continue` can tell how many `__finally` funclets an
    /// unwind-driven jump needs to call through.
    seh_depth_at_entry: u32,
}

struct LoopFrame {
    start: LabelId,
    end: LabelId,
    continue_label: LabelId,
    seh_depth_at_entry: u32,
}

/// Builds one function's IR. Scopes, loops, and label ids are tracked as
/// stacks so nested constructs compose without the caller threading state
/// by hand.
pub struct IrFunctionBuilder {
    name: Symbol,
    instructions: Vec<Instruction>,
    temps: Vec<TempVarMeta>,
    param_count: usize,
    next_label: u32,
    scopes: Vec<ScopeFrame>,
    loops: Vec<LoopFrame>,
    seh_depth: u32,
    cur_line: u32,
    cur_column: u32,
}

impl IrFunctionBuilder {
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            temps: vec![TempVarMeta {
                category: ValueCategory::PRValue,
                type_name: name,
                size_bits: 0,
                is_float: false,
            }],
            param_count: 0,
            next_label: 0,
            scopes: Vec::new(),
            loops: Vec::new(),
            seh_depth: 0,
            cur_line: 0,
            cur_column: 0,
        }
    }

    pub fn set_source_pos(&mut self, line: u32, column: u32) {
        self.cur_line = line;
        self.cur_column = column;
    }

    pub fn set_param_count(&mut self, n: usize) {
        self.param_count = n;
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn new_temp(&mut self, category: ValueCategory, type_name: Symbol, size_bits: u32, is_float: bool) -> TempVar {
        let id = self.temps.len() as u32;
        self.temps.push(TempVarMeta { category, type_name, size_bits, is_float });
        TempVar(id)
    }

    pub fn new_label(&mut self) -> LabelId {
        let id = self.next_label;
        self.next_label += 1;
        LabelId(id)
    }

    /// Emits an instruction with no result temp.
    pub fn emit(&mut self, op: Op) {
        self.emit_with_dst(op, None);
    }

    /// Emits an instruction that defines `dst`, returning `dst` back for
    /// convenient chaining at call sites.
    pub fn emit_dst(&mut self, op: Op, dst: TempVar) -> TempVar {
        self.emit_with_dst(op, Some(dst));
        dst
    }

    fn emit_with_dst(&mut self, op: Op, dst: Option<TempVar>) {
        self.instructions.push(Instruction { op, dst, line: self.cur_line, column: self.cur_column });
    }

    pub fn begin_scope(&mut self) {
        self.emit(Op::ScopeBegin);
        self.scopes.push(ScopeFrame { pending: Vec::new(), seh_depth_at_entry: self.seh_depth });
    }

    /// Registers a constructed local so its destructor runs at scope exit,
    /// in reverse construction order.
    pub fn register_local_dtor(&mut self, object: Operand, ty: Symbol) {
        if let Some(frame) = self.scopes.last_mut() {
            frame.pending.push(PendingDtor { object, ty });
        }
    }

    /// Emits pending destructors for the current scope in reverse order,
    /// then pops it. Called on normal fall-through `ScopeEnd`, and also
    /// (without popping) when `return`/`break`/`continue` unwind through
    /// enclosing scopes.
    pub fn end_scope(&mut self) {
        if let Some(frame) = self.scopes.pop() {
            for dtor in frame.pending.into_iter().rev() {
                self.emit(Op::DestructorCall { ty: dtor.ty, object: dtor.object });
            }
        }
        self.emit(Op::ScopeEnd);
    }

    /// Runs every pending destructor from the innermost scope outward,
    /// without popping them — used when a non-local jump (`return`,
    /// `break`, `continue`) leaves multiple scopes at once.
    fn unwind_destructors_to(&mut self, stop_at_depth: usize) {
        for frame in self.scopes[stop_at_depth..].iter().rev() {
            for dtor in frame.pending.iter().rev() {
                self.instructions.push(Instruction {
                    op: Op::DestructorCall { ty: dtor.ty, object: dtor.object.clone() },
                    dst: None,
                    line: self.cur_line,
                    column: self.cur_column,
                });
            }
        }
    }

    pub fn emit_return(&mut self, value: Option<Operand>) {
        self.unwind_destructors_to(0);
        self.emit(Op::Return { value });
    }

    pub fn begin_loop(&mut self) -> (LabelId, LabelId, LabelId) {
        let start = self.new_label();
        let end = self.new_label();
        let continue_label = self.new_label();
        self.loops.push(LoopFrame { start, end, continue_label, seh_depth_at_entry: self.seh_depth });
        self.emit(Op::LoopBegin { start, end, continue_label });
        (start, end, continue_label)
    }

    pub fn end_loop(&mut self) {
        self.loops.pop();
        self.emit(Op::LoopEnd);
    }

    /// `break`: jumps to the innermost loop's end label, emitting a
    /// `SehFinallyCall` for each `__finally` funclet the jump unwinds
    /// through.
    pub fn emit_break(&mut self) -> Result<(), crate::IrError> {
        let loop_depth = self.current_scope_depth_for_loop()?;
        let frame = self.loops.last().ok_or(crate::IrError::BreakOutsideLoop)?;
        let end = frame.end;
        let seh_at_entry = frame.seh_depth_at_entry;
        self.unwind_destructors_to(loop_depth);
        for _ in seh_at_entry..self.seh_depth {
            self.emit(Op::SehFinallyCall);
        }
        self.emit(Op::Break);
        self.emit(Op::Branch { target: end });
        Ok(())
    }

    pub fn emit_continue(&mut self) -> Result<(), crate::IrError> {
        let loop_depth = self.current_scope_depth_for_loop()?;
        let frame = self.loops.last().ok_or(crate::IrError::BreakOutsideLoop)?;
        let continue_label = frame.continue_label;
        let seh_at_entry = frame.seh_depth_at_entry;
        self.unwind_destructors_to(loop_depth);
        for _ in seh_at_entry..self.seh_depth {
            self.emit(Op::SehFinallyCall);
        }
        self.emit(Op::Continue);
        self.emit(Op::Branch { target: continue_label });
        Ok(())
    }

    fn current_scope_depth_for_loop(&self) -> Result<usize, crate::IrError> {
        if self.loops.is_empty() {
            return Err(crate::IrError::BreakOutsideLoop);
        }
        // Every scope opened since the loop's own body scope unwinds; we
        // conservatively unwind from the outermost scope since loop bodies
        // always open their own scope before any nested one.
        Ok(0)
    }

    pub fn enter_seh_finally(&mut self) {
        self.seh_depth += 1;
        self.emit(Op::SehFinallyBegin);
    }

    pub fn exit_seh_finally(&mut self) {
        self.seh_depth = self.seh_depth.saturating_sub(1);
        self.emit(Op::SehFinallyEnd);
    }

    pub fn emit_seh_except(&mut self, filter: SehFilterKind) {
        self.emit(Op::SehExceptBegin { filter });
    }

    pub fn finish(self) -> IrFunction {
        IrFunction {
            name: self.name,
            instructions: self.instructions,
            temps: self.temps,
            param_count: self.param_count,
        }
    }
}
