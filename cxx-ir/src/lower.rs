//! AST-to-IR lowering: walks a checked `FunctionDecl`'s body and emits the
//! flat instruction stream `cxx-codegen` consumes.

use crate::builder::{IrFunction, IrFunctionBuilder};
use crate::opcode::{AddressStep, BinArith, Cmp, Convert, Logical, Op, SehFilterKind};
use crate::value::{Operand, TempVar, ValueCategory};
use crate::IrError;
use cxx_ast::{
    AstArena, BaseTypeRef, BinOp, Block, CaptureMode, CastKind, ConstValue, DeclId, Expr,
    FunctionDecl, Interner, Stmt, Symbol, TypeSpec, UnOp,
};
use cxx_sema::{ConstraintEnv, TypeRegistry};
use std::collections::HashMap;

/// Lowers one function's checked body into its IR form. Functions with no
/// body (declarations only, pure virtuals) produce an empty instruction
/// stream with just the parameter count recorded.
///
/// A function whose body contains lambda expressions yields more than one
/// `IrFunction`: the first is `decl` itself, and each subsequent entry is
/// one lambda's synthesized `operator()` body, in the order its closure
/// was constructed. The driver adds all of them to the object.
pub fn lower_function(
    decl: &FunctionDecl,
    interner: &Interner,
    arena: &AstArena,
    types: &TypeRegistry,
) -> Result<Vec<IrFunction>, IrError> {
    let mangled = decl.mangled_name().unwrap_or(decl.name);
    let mut b = IrFunctionBuilder::new(mangled);
    b.set_param_count(decl.params.len());

    let pending = {
        let mut lowering = Lowering {
            b: &mut b,
            interner,
            arena,
            types,
            owner_class: decl.owner_class,
            lambda_seq: 0,
            pending_lambdas: Vec::new(),
        };
        if let Some(body) = decl.body() {
            lowering.lower_block(&body)?;
        }
        lowering.pending_lambdas
    };
    let mut out = vec![b.finish()];
    out.extend(pending);
    Ok(out)
}

struct Lowering<'a> {
    b: &'a mut IrFunctionBuilder,
    interner: &'a Interner,
    arena: &'a AstArena,
    types: &'a TypeRegistry,
    /// The class a `this`-qualified or unqualified member call resolves
    /// against, so its virtual-ness can be looked up in `types`. `None`
    /// for free functions and for nested lambda bodies (which don't yet
    /// resolve an enclosing object's virtual members).
    owner_class: Option<DeclId>,
    lambda_seq: u32,
    pending_lambdas: Vec<IrFunction>,
}

impl<'a> Lowering<'a> {
    fn lower_block(&mut self, block: &Block) -> Result<(), IrError> {
        self.b.begin_scope();
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        self.b.end_scope();
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), IrError> {
        match stmt {
            Stmt::Expr(e) => {
                self.lower_expr(e)?;
                Ok(())
            }
            Stmt::LocalVar(decls) => {
                for d in decls {
                    let (size_bits, is_float) = abi_shape(&d.ty);
                    let type_name = type_display_name(&d.ty, self.interner);
                    let slot = self.b.new_temp(ValueCategory::LValue, type_name, size_bits, is_float);
                    self.b.emit_dst(Op::StackAlloc { size_bits, align_bits: size_bits.max(8) }, slot);
                    if let Some(init) = &d.init {
                        let value = self.lower_expr(init)?;
                        self.b.emit(Op::Store { address: Operand::Temp(slot), value });
                    }
                    if is_class_type(&d.ty) {
                        self.b.register_local_dtor(Operand::Temp(slot), type_name);
                    }
                }
                Ok(())
            }
            Stmt::Block(block) => self.lower_block(block),
            Stmt::If { init, cond, then_branch, else_branch } => {
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                let cond_val = self.lower_expr(cond)?;
                let then_label = self.b.new_label();
                let else_label = self.b.new_label();
                let end_label = self.b.new_label();
                self.b.emit(Op::ConditionalBranch { cond: cond_val, if_true: then_label, if_false: else_label });
                self.b.emit(Op::Label { id: then_label });
                self.lower_stmt(then_branch)?;
                self.b.emit(Op::Branch { target: end_label });
                self.b.emit(Op::Label { id: else_label });
                if let Some(else_branch) = else_branch {
                    self.lower_stmt(else_branch)?;
                }
                self.b.emit(Op::Label { id: end_label });
                Ok(())
            }
            Stmt::While { cond, body } => {
                let (start, end, continue_label) = self.b.begin_loop();
                self.b.emit(Op::Label { id: continue_label });
                let cond_val = self.lower_expr(cond)?;
                self.b.emit(Op::ConditionalBranch { cond: cond_val, if_true: start, if_false: end });
                self.b.emit(Op::Label { id: start });
                self.lower_stmt(body)?;
                self.b.emit(Op::Branch { target: continue_label });
                self.b.emit(Op::Label { id: end });
                self.b.end_loop();
                Ok(())
            }
            Stmt::DoWhile { body, cond } => {
                let (start, end, continue_label) = self.b.begin_loop();
                self.b.emit(Op::Label { id: start });
                self.lower_stmt(body)?;
                self.b.emit(Op::Label { id: continue_label });
                let cond_val = self.lower_expr(cond)?;
                self.b.emit(Op::ConditionalBranch { cond: cond_val, if_true: start, if_false: end });
                self.b.emit(Op::Label { id: end });
                self.b.end_loop();
                Ok(())
            }
            Stmt::For { init, cond, step, body } => {
                self.b.begin_scope();
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                let (start, end, continue_label) = self.b.begin_loop();
                self.b.emit(Op::Label { id: start });
                if let Some(cond) = cond {
                    let cond_val = self.lower_expr(cond)?;
                    let body_label = self.b.new_label();
                    self.b.emit(Op::ConditionalBranch { cond: cond_val, if_true: body_label, if_false: end });
                    self.b.emit(Op::Label { id: body_label });
                }
                self.lower_stmt(body)?;
                self.b.emit(Op::Label { id: continue_label });
                if let Some(step) = step {
                    self.lower_expr(step)?;
                }
                self.b.emit(Op::Branch { target: start });
                self.b.emit(Op::Label { id: end });
                self.b.end_loop();
                self.b.end_scope();
                Ok(())
            }
            Stmt::RangeFor { init, binding, binding_ty, range, body } => {
                // Desugars to the begin()/end() iterator-pair form; the
                // iterator's own increment/dereference calls are resolved by
                // sema ahead of lowering and surface here as ordinary calls
                // on the `__begin`/`__end` temporaries.
                self.b.begin_scope();
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                let range_val = self.lower_expr(range)?;
                let iter_ty = self.interner.intern("__iterator");
                let begin = self.b.new_temp(ValueCategory::LValue, iter_ty, 64, false);
                let end_iter = self.b.new_temp(ValueCategory::LValue, iter_ty, 64, false);
                self.b.emit_dst(
                    Op::FunctionCall { callee: self.interner.intern("begin"), args: vec![range_val.clone()], return_slot: Some(begin) },
                    begin,
                );
                self.b.emit_dst(
                    Op::FunctionCall { callee: self.interner.intern("end"), args: vec![range_val], return_slot: Some(end_iter) },
                    end_iter,
                );

                let (start, end, continue_label) = self.b.begin_loop();
                self.b.emit(Op::Label { id: start });
                let ne = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("bool"), 8, false);
                self.b.emit_dst(
                    Op::Compare { kind: Cmp::NeInt, lhs: Operand::Temp(begin), rhs: Operand::Temp(end_iter) },
                    ne,
                );
                let body_label = self.b.new_label();
                self.b.emit(Op::ConditionalBranch { cond: Operand::Temp(ne), if_true: body_label, if_false: end });
                self.b.emit(Op::Label { id: body_label });

                let binding_ty_name = binding_ty
                    .as_ref()
                    .map(|t| type_display_name(t, self.interner))
                    .unwrap_or(iter_ty);
                let (size_bits, is_float) = binding_ty.as_ref().map(abi_shape).unwrap_or((64, false));
                let element = self.b.new_temp(ValueCategory::LValue, binding_ty_name, size_bits, is_float);
                self.b.emit_dst(Op::Dereference { pointer: Operand::Temp(begin) }, element);
                self.b.emit(Op::Store { address: Operand::Named(*binding), value: Operand::Temp(element) });

                self.b.begin_scope();
                self.lower_stmt(body)?;
                self.b.end_scope();

                self.b.emit(Op::Label { id: continue_label });
                self.b.emit(Op::Convert { kind: Convert::BitcastPointer, operand: Operand::Temp(begin) });
                self.b.emit(Op::Branch { target: start });
                self.b.emit(Op::Label { id: end });
                self.b.end_loop();
                self.b.end_scope();
                Ok(())
            }
            Stmt::Return(value) => {
                let value = value.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                self.b.emit_return(value);
                Ok(())
            }
            Stmt::Break => self.b.emit_break().map_err(|_| IrError::BreakOutsideLoop),
            Stmt::Continue => self.b.emit_continue().map_err(|_| IrError::ContinueOutsideLoop),
            Stmt::Switch { cond, cases } => {
                let cond_val = self.lower_expr(cond)?;
                let end_label = self.b.new_label();
                let case_labels: Vec<_> = cases.iter().map(|_| self.b.new_label()).collect();
                let default_idx = cases.iter().position(|c| c.labels.iter().any(|l| matches!(l, cxx_ast::SwitchLabel::Default)));

                for (case, label) in cases.iter().zip(case_labels.iter()) {
                    for lbl in &case.labels {
                        if let cxx_ast::SwitchLabel::Case(cv) = lbl {
                            let imm = Operand::Immediate(cv.clone());
                            let eq = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("bool"), 8, false);
                            self.b.emit_dst(Op::Compare { kind: Cmp::EqInt, lhs: cond_val.clone(), rhs: imm }, eq);
                            let next = self.b.new_label();
                            self.b.emit(Op::ConditionalBranch { cond: Operand::Temp(eq), if_true: *label, if_false: next });
                            self.b.emit(Op::Label { id: next });
                        }
                    }
                }
                match default_idx {
                    Some(idx) => self.b.emit(Op::Branch { target: case_labels[idx] }),
                    None => self.b.emit(Op::Branch { target: end_label }),
                }

                for (case, label) in cases.iter().zip(case_labels.iter()) {
                    self.b.emit(Op::Label { id: *label });
                    for s in &case.stmts {
                        self.lower_stmt(s)?;
                    }
                }
                self.b.emit(Op::Label { id: end_label });
                Ok(())
            }
            Stmt::Try { body, handlers } => {
                self.b.emit(Op::TryBegin);
                self.lower_block(body)?;
                self.b.emit(Op::TryEnd);
                for h in handlers {
                    let exception_ty = h.param.as_ref().map(|(_, ty)| type_display_name(ty, self.interner));
                    self.b.emit(Op::CatchBegin { exception_ty });
                    self.lower_block(&h.body)?;
                    self.b.emit(Op::CatchEnd);
                }
                Ok(())
            }
            Stmt::SehTry { body, except, finally } => {
                self.b.emit(Op::SehTryBegin);
                self.lower_block(body)?;
                self.b.emit(Op::SehTryEnd);
                if let Some((filter_expr, handler)) = except {
                    let filter = match filter_expr {
                        Expr::IntLiteral(v) => SehFilterKind::Constant(*v as i32),
                        _ => SehFilterKind::Expression,
                    };
                    self.b.emit_seh_except(filter);
                    if matches!(filter, SehFilterKind::Expression) {
                        self.b.emit(Op::SehFilterBegin);
                        self.lower_expr(filter_expr)?;
                        self.b.emit(Op::SehFilterEnd);
                    }
                    self.lower_block(handler)?;
                    self.b.emit(Op::SehExceptEnd);
                }
                if let Some(finally) = finally {
                    self.b.enter_seh_finally();
                    self.lower_block(finally)?;
                    self.b.exit_seh_finally();
                }
                Ok(())
            }
            Stmt::Empty => Ok(()),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<Operand, IrError> {
        let int_ty = self.interner.intern("int");
        let bool_ty = self.interner.intern("bool");
        Ok(match expr {
            Expr::IntLiteral(v) => Operand::Immediate(ConstValue::Int(*v)),
            Expr::UIntLiteral(v) => Operand::Immediate(ConstValue::UInt(*v)),
            Expr::BoolLiteral(v) => Operand::Immediate(ConstValue::Bool(*v)),
            Expr::CharLiteral(v) => Operand::Immediate(ConstValue::Char(*v)),
            Expr::FloatLiteral(v) => {
                let t = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("double"), 64, true);
                self.b.emit_dst(Op::Convert { kind: Convert::IntToFloat, operand: Operand::Immediate(ConstValue::Int(*v as i64)) }, t);
                Operand::Temp(t)
            }
            Expr::StringLiteral(sym) => Operand::Global(*sym),
            Expr::NullPtr => Operand::Immediate(ConstValue::Int(0)),
            Expr::This => Operand::Named(self.interner.intern("this")),
            Expr::Name { name, .. } => Operand::Named(*name),
            Expr::QualifiedName { path, .. } => Operand::Global(*path.last().unwrap_or(name_fallback(path))),
            Expr::Paren(inner) => self.lower_expr(inner)?,
            Expr::Binary { op, lhs, rhs } => {
                let lhs_val = self.lower_expr(lhs)?;
                let rhs_val = self.lower_expr(rhs)?;
                if matches!(op, BinOp::LogAnd | BinOp::LogOr) {
                    let kind = if matches!(op, BinOp::LogAnd) { Logical::And } else { Logical::Or };
                    let t = self.b.new_temp(ValueCategory::PRValue, bool_ty, 8, false);
                    self.b.emit_dst(Op::LogicalOp { kind, lhs: lhs_val, rhs: Some(rhs_val) }, t);
                    Operand::Temp(t)
                } else if let Some(cmp) = bin_op_to_cmp(*op) {
                    let t = self.b.new_temp(ValueCategory::PRValue, bool_ty, 8, false);
                    self.b.emit_dst(Op::Compare { kind: cmp, lhs: lhs_val, rhs: rhs_val }, t);
                    Operand::Temp(t)
                } else {
                    let kind = bin_op_to_arith(*op);
                    let t = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                    self.b.emit_dst(Op::BinaryOp { kind, lhs: lhs_val, rhs: rhs_val }, t);
                    Operand::Temp(t)
                }
            }
            Expr::Unary { op, operand } => {
                let val = self.lower_expr(operand)?;
                match op {
                    UnOp::Neg => {
                        let t = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                        self.b.emit_dst(Op::Negate { operand: val }, t);
                        Operand::Temp(t)
                    }
                    UnOp::Not => {
                        let t = self.b.new_temp(ValueCategory::PRValue, bool_ty, 8, false);
                        self.b.emit_dst(Op::LogicalOp { kind: Logical::Not, lhs: val, rhs: None }, t);
                        Operand::Temp(t)
                    }
                    UnOp::BitNot => {
                        let t = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                        self.b.emit_dst(Op::BitNot { operand: val }, t);
                        Operand::Temp(t)
                    }
                    UnOp::Deref => {
                        let t = self.b.new_temp(ValueCategory::LValue, int_ty, 32, false);
                        self.b.emit_dst(Op::Dereference { pointer: val }, t);
                        Operand::Temp(t)
                    }
                    UnOp::AddrOf => {
                        let t = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("pointer"), 64, false);
                        self.b.emit_dst(Op::AddressOf { value: val }, t);
                        Operand::Temp(t)
                    }
                    UnOp::Plus => val,
                    UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                        let kind = if matches!(op, UnOp::PreInc | UnOp::PostInc) { BinArith::AddInt } else { BinArith::SubInt };
                        let old = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                        self.b.emit_dst(Op::Load { address: val.clone() }, old);
                        let updated = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                        self.b.emit_dst(Op::BinaryOp { kind, lhs: Operand::Temp(old), rhs: Operand::Immediate(ConstValue::Int(1)) }, updated);
                        self.b.emit(Op::Store { address: val, value: Operand::Temp(updated) });
                        Operand::Temp(if matches!(op, UnOp::PreInc | UnOp::PreDec) { updated } else { old })
                    }
                }
            }
            Expr::Assign { compound, lhs, rhs } => {
                let addr = self.lower_lvalue_address(lhs)?;
                let rhs_val = self.lower_expr(rhs)?;
                let value = match compound {
                    None => rhs_val,
                    Some(op) => {
                        let current = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                        self.b.emit_dst(Op::Load { address: addr.clone() }, current);
                        let kind = bin_op_to_arith(*op);
                        let t = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                        self.b.emit_dst(Op::BinaryOp { kind, lhs: Operand::Temp(current), rhs: rhs_val }, t);
                        Operand::Temp(t)
                    }
                };
                self.b.emit(Op::Store { address: addr, value: value.clone() });
                value
            }
            Expr::Conditional { cond, then_expr, else_expr } => {
                let cond_val = self.lower_expr(cond)?;
                let then_label = self.b.new_label();
                let else_label = self.b.new_label();
                let end_label = self.b.new_label();
                let result = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                self.b.emit(Op::ConditionalBranch { cond: cond_val, if_true: then_label, if_false: else_label });
                self.b.emit(Op::Label { id: then_label });
                let then_val = self.lower_expr(then_expr)?;
                self.b.emit(Op::Store { address: Operand::Temp(result), value: then_val });
                self.b.emit(Op::Branch { target: end_label });
                self.b.emit(Op::Label { id: else_label });
                let else_val = self.lower_expr(else_expr)?;
                self.b.emit(Op::Store { address: Operand::Temp(result), value: else_val });
                self.b.emit(Op::Label { id: end_label });
                Operand::Temp(result)
            }
            Expr::Call { callee, args } => {
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    arg_vals.push(self.lower_expr(a)?);
                }
                let ret = self.b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
                match callee.as_ref() {
                    Expr::Name { name, .. } => {
                        if let Some(slot) = self.resolve_virtual_slot(self.owner_class, *name) {
                            let this_val = Operand::Named(self.interner.intern("this"));
                            self.b.emit_dst(Op::VirtualCall { vtable_slot: slot, object: this_val, args: arg_vals }, ret);
                        } else {
                            self.b.emit_dst(Op::FunctionCall { callee: *name, args: arg_vals, return_slot: Some(ret) }, ret);
                        }
                    }
                    Expr::MemberAccess { object, member, .. } => {
                        let obj_val = self.lower_expr(object)?;
                        let owner = if matches!(object.as_ref(), Expr::This) { self.owner_class } else { None };
                        if let Some(slot) = self.resolve_virtual_slot(owner, *member) {
                            self.b.emit_dst(Op::VirtualCall { vtable_slot: slot, object: obj_val, args: arg_vals }, ret);
                        } else {
                            arg_vals.insert(0, obj_val);
                            self.b.emit_dst(Op::FunctionCall { callee: *member, args: arg_vals, return_slot: Some(ret) }, ret);
                        }
                    }
                    other => {
                        let callee_val = self.lower_expr(other)?;
                        self.b.emit_dst(Op::IndirectCall { callee: callee_val, args: arg_vals }, ret);
                    }
                }
                Operand::Temp(ret)
            }
            Expr::MemberAccess { object, member, .. } => {
                let obj_val = self.lower_expr(object)?;
                let t = self.b.new_temp(ValueCategory::LValue, int_ty, 32, false);
                self.b.emit_dst(Op::MemberAccess { object: obj_val, field: *member, offset_bits: 0 }, t);
                Operand::Temp(t)
            }
            Expr::Index { object, index } => {
                let obj_val = self.lower_expr(object)?;
                let idx_val = self.lower_expr(index)?;
                let t = self.b.new_temp(ValueCategory::LValue, int_ty, 32, false);
                self.b.emit_dst(
                    Op::ComputeAddress { base: obj_val, chain: vec![AddressStep::ArrayIndex { elem_size_bits: 32, index: idx_val }] },
                    t,
                );
                Operand::Temp(t)
            }
            Expr::Cast { kind, target, expr } => {
                let val = self.lower_expr(expr)?;
                let conv = match kind {
                    CastKind::Dynamic => {
                        let target_ty = type_display_name(target, self.interner);
                        let t = self.b.new_temp(ValueCategory::PRValue, target_ty, 64, false);
                        self.b.emit_dst(Op::DynamicCast { object: val, target_ty }, t);
                        return Ok(Operand::Temp(t));
                    }
                    _ => cast_to_convert(target),
                };
                let (size_bits, is_float) = abi_shape(target);
                let type_name = type_display_name(target, self.interner);
                let t = self.b.new_temp(ValueCategory::PRValue, type_name, size_bits, is_float);
                self.b.emit_dst(Op::Convert { kind: conv, operand: val }, t);
                Operand::Temp(t)
            }
            Expr::New { ty, array_size, ctor_args, .. } => {
                let type_name = type_display_name(ty, self.interner);
                let (size_bits, _) = abi_shape(ty);
                match array_size {
                    Some(count_expr) => {
                        let count_val = self.lower_expr(count_expr)?;
                        let t = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("pointer"), 64, false);
                        self.b.emit_dst(Op::HeapAllocArray { elem_size_bits: size_bits, count: count_val }, t);
                        Operand::Temp(t)
                    }
                    None => {
                        let t = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("pointer"), 64, false);
                        self.b.emit_dst(Op::HeapAlloc { size_bits }, t);
                        let mut arg_vals = Vec::with_capacity(ctor_args.len());
                        for a in ctor_args {
                            arg_vals.push(self.lower_expr(a)?);
                        }
                        self.b.emit(Op::ConstructorCall { ty: type_name, object: Operand::Temp(t), args: arg_vals });
                        Operand::Temp(t)
                    }
                }
            }
            Expr::Delete { expr, is_array } => {
                let val = self.lower_expr(expr)?;
                self.b.emit(if *is_array { Op::HeapFreeArray { pointer: val } } else { Op::HeapFree { pointer: val } });
                Operand::Immediate(ConstValue::Int(0))
            }
            Expr::Sizeof { of } => match of {
                cxx_ast::SizeofOperand::Type(ty) => {
                    let (size_bits, _) = abi_shape(ty);
                    Operand::Immediate(ConstValue::UInt((size_bits / 8) as u64))
                }
                cxx_ast::SizeofOperand::Expr(e) => {
                    // The operand isn't evaluated (`sizeof` is a
                    // compile-time query); only its shape matters, and
                    // lowering doesn't carry expression types, so this
                    // falls back to the pointer-word size.
                    let _ = self.lower_expr(e)?;
                    Operand::Immediate(ConstValue::UInt(8))
                }
            },
            Expr::Typeid { of } => {
                let name = match of {
                    cxx_ast::SizeofOperand::Type(ty) => type_display_name(ty, self.interner),
                    cxx_ast::SizeofOperand::Expr(e) => {
                        let _ = self.lower_expr(e)?;
                        self.interner.intern("auto")
                    }
                };
                let t = self.b.new_temp(ValueCategory::PRValue, name, 64, false);
                self.b.emit_dst(Op::Typeid { ty: name }, t);
                Operand::Temp(t)
            }
            Expr::InitializerList(items) => {
                let mut last = Operand::Immediate(ConstValue::Int(0));
                for item in items {
                    last = self.lower_expr(item)?;
                }
                last
            }
            Expr::Throw(value) => {
                let value = value.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                self.b.emit(Op::Throw { value });
                Operand::Immediate(ConstValue::Int(0))
            }
            Expr::Lambda { captures, params, body, .. } => self.lower_lambda(captures, params, body)?,
            Expr::Requires { .. } => Operand::Immediate(ConstValue::Bool(true)),
            Expr::TraitIntrinsic { name, type_args } => {
                let substitutions = HashMap::new();
                let env = ConstraintEnv { substitutions: &substitutions, types: self.types, interner: self.interner };
                let satisfied = cxx_sema::evaluate_constraint(
                    &Expr::TraitIntrinsic { name: *name, type_args: type_args.clone() },
                    &env,
                )
                .is_satisfied();
                Operand::Immediate(ConstValue::Bool(satisfied))
            }
        })
    }

    /// Lowers an lvalue expression to the address that should be stored
    /// through, used by `Assign` and compound-assignment operators.
    fn lower_lvalue_address(&mut self, expr: &Expr) -> Result<Operand, IrError> {
        match expr {
            Expr::Name { name, .. } => Ok(Operand::Named(*name)),
            Expr::MemberAccess { object, member, .. } => {
                let obj_val = self.lower_expr(object)?;
                let int_ty = self.interner.intern("int");
                let t = self.b.new_temp(ValueCategory::LValue, int_ty, 32, false);
                self.b.emit_dst(Op::MemberAccess { object: obj_val, field: *member, offset_bits: 0 }, t);
                Ok(Operand::Temp(t))
            }
            Expr::Index { object, index } => {
                let obj_val = self.lower_expr(object)?;
                let idx_val = self.lower_expr(index)?;
                let int_ty = self.interner.intern("int");
                let t = self.b.new_temp(ValueCategory::LValue, int_ty, 32, false);
                self.b.emit_dst(
                    Op::ComputeAddress { base: obj_val, chain: vec![AddressStep::ArrayIndex { elem_size_bits: 32, index: idx_val }] },
                    t,
                );
                Ok(Operand::Temp(t))
            }
            Expr::Unary { op: UnOp::Deref, operand } => self.lower_expr(operand),
            Expr::Paren(inner) => self.lower_lvalue_address(inner),
            other => self.lower_expr(other),
        }
    }

    /// Materializes a lambda's closure object (one field per explicit
    /// capture, in declaration order) and queues its `operator()` body to
    /// be lowered as a sibling `IrFunction` once this function is done.
    /// `[=]`/`[&]` default captures aren't tracked back to an enclosing
    /// scope's live variable set here, so only an explicit capture list
    /// produces fields; a default-capture lambda gets an empty closure.
    fn lower_lambda(&mut self, captures: &CaptureMode, params: &[cxx_ast::LambdaParam], body: &Block) -> Result<Operand, IrError> {
        self.lambda_seq += 1;
        let enclosing = self.interner.resolve(self.b.name());
        let closure_ty = self.interner.intern(&format!("{enclosing}$lambda{}", self.lambda_seq));
        let closure = self.b.new_temp(ValueCategory::PRValue, closure_ty, 64, false);
        self.b.emit_dst(Op::StackAlloc { size_bits: 64, align_bits: 8 }, closure);

        if let CaptureMode::Explicit(captures) = captures {
            for (i, capture) in captures.iter().enumerate() {
                let value = match &capture.init {
                    Some(init) => self.lower_expr(init)?,
                    None if capture.by_reference => {
                        let addr = self.b.new_temp(ValueCategory::PRValue, self.interner.intern("pointer"), 64, false);
                        self.b.emit_dst(Op::AddressOf { value: Operand::Named(capture.name) }, addr);
                        Operand::Temp(addr)
                    }
                    None => Operand::Named(capture.name),
                };
                let field_addr = self.b.new_temp(ValueCategory::LValue, closure_ty, 64, false);
                self.b.emit_dst(
                    Op::ComputeAddress {
                        base: Operand::Temp(closure),
                        chain: vec![AddressStep::FieldOffset { field: capture.name, offset_bits: i as u32 * 64 }],
                    },
                    field_addr,
                );
                self.b.emit(Op::Store { address: Operand::Temp(field_addr), value });
            }
        }

        let call_name = self.interner.intern(&format!("{enclosing}$lambda{}$call", self.lambda_seq));
        let mut call_b = IrFunctionBuilder::new(call_name);
        call_b.set_param_count(params.len() + 1);
        let nested_pending = {
            let mut nested = Lowering {
                b: &mut call_b,
                interner: self.interner,
                arena: self.arena,
                types: self.types,
                owner_class: None,
                lambda_seq: 0,
                pending_lambdas: Vec::new(),
            };
            nested.lower_block(body)?;
            nested.pending_lambdas
        };
        self.pending_lambdas.push(call_b.finish());
        self.pending_lambdas.extend(nested_pending);

        Ok(Operand::Temp(closure))
    }

    /// Resolves `member`'s vtable slot against the struct type built from
    /// `owner`, if any — used to decide whether a call lowers to
    /// `Op::VirtualCall` (dynamic dispatch through the object's vtable) or
    /// an ordinary `Op::FunctionCall` to the statically-named member.
    fn resolve_virtual_slot(&self, owner: Option<DeclId>, member: Symbol) -> Option<u32> {
        let owner = owner?;
        let idx = self.types.resolve_by_origin(owner)?;
        let info = self.types.get(idx);
        let s = info.as_struct()?;
        s.methods.iter().find_map(|m| {
            let f = self.arena.get(m.decl).as_function()?;
            if f.name == member {
                m.vtable_slot
            } else {
                None
            }
        })
    }
}

fn name_fallback(path: &[Symbol]) -> &Symbol {
    path.first().unwrap_or_else(|| unreachable!("qualified name path is never empty"))
}

fn bin_op_to_cmp(op: BinOp) -> Option<Cmp> {
    Some(match op {
        BinOp::Eq => Cmp::EqInt,
        BinOp::Ne => Cmp::NeInt,
        BinOp::Lt => Cmp::LtInt,
        BinOp::Le => Cmp::LeInt,
        BinOp::Gt => Cmp::GtInt,
        BinOp::Ge => Cmp::GeInt,
        _ => return None,
    })
}

fn bin_op_to_arith(op: BinOp) -> BinArith {
    match op {
        BinOp::Add => BinArith::AddInt,
        BinOp::Sub => BinArith::SubInt,
        BinOp::Mul => BinArith::MulInt,
        BinOp::Div => BinArith::DivInt,
        BinOp::Mod => BinArith::ModInt,
        BinOp::Shl => BinArith::Shl,
        BinOp::Shr => BinArith::ShrArith,
        BinOp::BitAnd => BinArith::BitAnd,
        BinOp::BitOr => BinArith::BitOr,
        BinOp::BitXor => BinArith::BitXor,
        BinOp::Comma | BinOp::LogAnd | BinOp::LogOr => BinArith::AddInt,
    }
}

fn cast_to_convert(target: &TypeSpec) -> Convert {
    match target.base {
        BaseTypeRef::Float | BaseTypeRef::Double | BaseTypeRef::LongDouble => Convert::IntToFloat,
        _ => Convert::Truncate,
    }
}

fn is_class_type(ty: &TypeSpec) -> bool {
    ty.pointer_levels.is_empty() && ty.reference.is_none() && matches!(ty.base, BaseTypeRef::Named(_))
}

fn abi_shape(ty: &TypeSpec) -> (u32, bool) {
    if !ty.pointer_levels.is_empty() || ty.reference.is_some() {
        return (64, false);
    }
    match ty.base {
        BaseTypeRef::Bool | BaseTypeRef::Char | BaseTypeRef::SChar | BaseTypeRef::UChar => (8, false),
        BaseTypeRef::Short | BaseTypeRef::UShort => (16, false),
        BaseTypeRef::Int | BaseTypeRef::UInt | BaseTypeRef::Float => (32, matches!(ty.base, BaseTypeRef::Float)),
        BaseTypeRef::Long
        | BaseTypeRef::ULong
        | BaseTypeRef::LongLong
        | BaseTypeRef::ULongLong
        | BaseTypeRef::Double => (64, matches!(ty.base, BaseTypeRef::Double)),
        BaseTypeRef::LongDouble => (128, true),
        _ => (64, false),
    }
}

fn type_display_name(ty: &TypeSpec, interner: &Interner) -> Symbol {
    match &ty.base {
        BaseTypeRef::Named(sym) => *sym,
        BaseTypeRef::Qualified(path) => *path.last().unwrap_or_else(|| unreachable!("qualified type path is never empty")),
        BaseTypeRef::Int => interner.intern("int"),
        BaseTypeRef::UInt => interner.intern("unsigned int"),
        BaseTypeRef::Bool => interner.intern("bool"),
        BaseTypeRef::Float => interner.intern("float"),
        BaseTypeRef::Double => interner.intern("double"),
        BaseTypeRef::Void => interner.intern("void"),
        _ => interner.intern("auto"),
    }
}
