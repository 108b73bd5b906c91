//! The thin collaborator that wires the six phases together: tokenize,
//! parse (with recovery), mangle, lower to IR, encode to machine code,
//! build EH metadata, and write a relocatable object file. Kept as a
//! library so `cxxc`'s binary stays a CLI shell and so the pipeline can be
//! exercised directly in integration tests without spawning a subprocess.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;

use cxx_ast::{AstArena, Block, Decl, DeclId, Expr, FileId, Interner, Stmt, Symbol, TemplateArg, VecTokenStream};
use cxx_codegen::{CallingConvention, ProloguKind, RuntimeSymbols};
use cxx_diagnostics::{DiagnosticEngine, Outcome};
use cxx_eh::seh::FuncInfo;
use cxx_eh::{encode_ip_to_state_map, encode_try_block_map};
use cxx_objwriter::{ObjectTarget, ObjectWriter, VtableLayout};
use cxx_sema::mangle::Abi;
use cxx_sema::SemaContext;

/// Target selection: the only two ABI/object-format pairs this core knows,
/// chosen from `--target` or the host triple when absent.
pub fn resolve_target(target: Option<&str>) -> (ObjectTarget, CallingConvention) {
    let triple = target.unwrap_or(std::env::consts::OS);
    if triple.contains("windows") || triple.contains("msvc") {
        (ObjectTarget::CoffWin64, CallingConvention::Win64)
    } else {
        (ObjectTarget::ElfSysV, CallingConvention::SysV)
    }
}

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Parses `source` into the arena's global namespace, reporting every
/// collected diagnostic and failing the whole pipeline if any of them were
/// errors. `display_path` is used only for diagnostic/error messages.
pub fn parse_source<'a>(
    display_path: &Path,
    source: &str,
    arena: &'a AstArena,
    interner: &'a Interner,
) -> Result<DeclId> {
    parse_source_with_stream(display_path, source, arena, interner).map(|(id, _)| id)
}

/// Same as [`parse_source`] but also hands back the token stream, since
/// explicit template instantiation needs to re-enter it at a saved
/// position after the initial parse has completed.
pub fn parse_source_with_stream<'a>(
    display_path: &Path,
    source: &str,
    arena: &'a AstArena,
    interner: &'a Interner,
) -> Result<(DeclId, VecTokenStream)> {
    let tokens = cxx_tokens::tokenize(source, FileId(0), interner)
        .with_context(|| format!("tokenizing {}", display_path.display()))?;
    let mut stream = VecTokenStream::new(tokens);
    let (global_id, diagnostics) = cxx_parser::parse_translation_unit_with_recovery(&mut stream, arena, interner);
    if diagnostics.has_diagnostics() {
        diagnostics.print_all(source);
    }
    if diagnostics.has_errors() {
        return Err(anyhow!(
            "{} error(s) parsing {}",
            diagnostics.error_count(),
            display_path.display()
        ));
    }
    Ok((global_id, stream))
}

/// Computes and attaches each collected function's mangled name, the one
/// piece of the Template & Overload Engine every compiled function needs
/// regardless of whether it is itself a template.
pub fn mangle_functions(arena: &AstArena, interner: &Interner, abi: Abi, function_ids: &[DeclId]) {
    for &id in function_ids {
        let func = match arena.get(id).as_function() {
            Some(f) => f,
            None => continue,
        };
        if func.mangled_name().is_some() {
            continue;
        }
        let mangled = cxx_sema::mangle(abi, interner, func);
        func.attach_mangled_name(interner.intern(&mangled));
    }
}

/// Walks the namespace/class tree collecting every function declaration
/// that has a body, in declaration order.
pub fn collect_functions(arena: &AstArena, id: DeclId, out: &mut Vec<DeclId>) {
    match arena.get(id) {
        Decl::Namespace(ns) => {
            for &child in ns.items.borrow().iter() {
                collect_functions(arena, child, out);
            }
        }
        Decl::Class(class) => {
            for &child in class.methods.borrow().iter() {
                collect_functions(arena, child, out);
            }
            for &child in class.nested.borrow().iter() {
                collect_functions(arena, child, out);
            }
        }
        Decl::Function(func) => {
            if func.body().is_some() {
                out.push(id);
            }
        }
        Decl::Enum(_) | Decl::TypeAlias(_) | Decl::Variable(_) => {}
    }
}

/// Walks the namespace/class tree indexing every function *template* (a
/// function declaration with template parameters) by name, so an explicit
/// instantiation call site can be resolved back to the declaration that
/// owns its deferred body.
fn collect_function_templates(arena: &AstArena, id: DeclId, out: &mut HashMap<Symbol, DeclId>) {
    match arena.get(id) {
        Decl::Namespace(ns) => {
            for &child in ns.items.borrow().iter() {
                collect_function_templates(arena, child, out);
            }
        }
        Decl::Class(class) => {
            for &child in class.methods.borrow().iter() {
                collect_function_templates(arena, child, out);
            }
            for &child in class.nested.borrow().iter() {
                collect_function_templates(arena, child, out);
            }
        }
        Decl::Function(f) => {
            if !f.template_params.is_empty() {
                out.entry(f.name).or_insert(id);
            }
        }
        Decl::Enum(_) | Decl::TypeAlias(_) | Decl::Variable(_) => {}
    }
}

/// Collects every `name<args>(...)` call expression with a non-empty
/// explicit template argument list appearing anywhere in `block`.
fn collect_explicit_template_calls(block: &Block, out: &mut Vec<(Symbol, Vec<TemplateArg>)>) {
    for stmt in &block.stmts {
        collect_calls_in_stmt(stmt, out);
    }
}

fn collect_calls_in_stmt(stmt: &Stmt, out: &mut Vec<(Symbol, Vec<TemplateArg>)>) {
    match stmt {
        Stmt::Expr(e) | Stmt::Return(Some(e)) => collect_calls_in_expr(e, out),
        Stmt::LocalVar(decls) => {
            for d in decls {
                if let Some(e) = &d.init {
                    collect_calls_in_expr(e, out);
                }
            }
        }
        Stmt::Block(b) => collect_explicit_template_calls(b, out),
        Stmt::If { init, cond, then_branch, else_branch } => {
            if let Some(s) = init {
                collect_calls_in_stmt(s, out);
            }
            collect_calls_in_expr(cond, out);
            collect_calls_in_stmt(then_branch, out);
            if let Some(s) = else_branch {
                collect_calls_in_stmt(s, out);
            }
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            collect_calls_in_expr(cond, out);
            collect_calls_in_stmt(body, out);
        }
        Stmt::For { init, cond, step, body } => {
            if let Some(s) = init {
                collect_calls_in_stmt(s, out);
            }
            if let Some(e) = cond {
                collect_calls_in_expr(e, out);
            }
            if let Some(e) = step {
                collect_calls_in_expr(e, out);
            }
            collect_calls_in_stmt(body, out);
        }
        Stmt::RangeFor { init, range, body, .. } => {
            if let Some(s) = init {
                collect_calls_in_stmt(s, out);
            }
            collect_calls_in_expr(range, out);
            collect_calls_in_stmt(body, out);
        }
        Stmt::Switch { cond, cases } => {
            collect_calls_in_expr(cond, out);
            for case in cases {
                for s in &case.stmts {
                    collect_calls_in_stmt(s, out);
                }
            }
        }
        Stmt::Try { body, handlers } => {
            collect_explicit_template_calls(body, out);
            for h in handlers {
                collect_explicit_template_calls(&h.body, out);
            }
        }
        Stmt::SehTry { body, except, finally } => {
            collect_explicit_template_calls(body, out);
            if let Some((filter, handler)) = except {
                collect_calls_in_expr(filter, out);
                collect_explicit_template_calls(handler, out);
            }
            if let Some(f) = finally {
                collect_explicit_template_calls(f, out);
            }
        }
        Stmt::Return(None) | Stmt::Break | Stmt::Continue | Stmt::Empty => {}
    }
}

fn collect_calls_in_expr(expr: &Expr, out: &mut Vec<(Symbol, Vec<TemplateArg>)>) {
    match expr {
        Expr::Call { callee, args } => {
            if let Expr::Name { name, explicit_args } = callee.as_ref() {
                if !explicit_args.is_empty() {
                    out.push((*name, explicit_args.clone()));
                }
            } else {
                collect_calls_in_expr(callee, out);
            }
            for a in args {
                collect_calls_in_expr(a, out);
            }
        }
        Expr::Binary { lhs, rhs, .. } | Expr::Assign { lhs, rhs, .. } | Expr::Index { object: lhs, index: rhs } => {
            collect_calls_in_expr(lhs, out);
            collect_calls_in_expr(rhs, out);
        }
        Expr::Unary { operand, .. } | Expr::Cast { expr: operand, .. } | Expr::Paren(operand) | Expr::Delete { expr: operand, .. } => {
            collect_calls_in_expr(operand, out)
        }
        Expr::Conditional { cond, then_expr, else_expr } => {
            collect_calls_in_expr(cond, out);
            collect_calls_in_expr(then_expr, out);
            collect_calls_in_expr(else_expr, out);
        }
        Expr::MemberAccess { object, .. } => collect_calls_in_expr(object, out),
        Expr::New { array_size, placement, ctor_args, .. } => {
            if let Some(e) = array_size {
                collect_calls_in_expr(e, out);
            }
            for e in placement.iter().chain(ctor_args.iter()) {
                collect_calls_in_expr(e, out);
            }
        }
        Expr::InitializerList(items) => {
            for e in items {
                collect_calls_in_expr(e, out);
            }
        }
        Expr::Throw(Some(e)) => collect_calls_in_expr(e, out),
        Expr::Lambda { body, .. } => collect_explicit_template_calls(body, out),
        _ => {}
    }
}

/// Finds every explicit function-template instantiation call site reachable
/// from `root`'s already-collected function bodies and instantiates each
/// one, repeating until a pass produces nothing new (an instantiated body
/// can itself call another template) or `MAX_INSTANTIATION_PASSES` is hit.
/// Returns the fresh `DeclId`s so the caller can fold them into the set of
/// functions it lowers.
const MAX_INSTANTIATION_PASSES: u32 = 64;

pub fn instantiate_explicit_calls(
    ctx: &SemaContext,
    arena: &AstArena,
    interner: &Interner,
    stream: &mut VecTokenStream,
    root: DeclId,
    seed_function_ids: &[DeclId],
) -> Result<Vec<DeclId>> {
    let mut templates_by_name = HashMap::new();
    collect_function_templates(arena, root, &mut templates_by_name);
    if templates_by_name.is_empty() {
        return Ok(Vec::new());
    }

    let mut frontier: Vec<DeclId> = seed_function_ids.to_vec();
    let mut instantiated = Vec::new();
    for _ in 0..MAX_INSTANTIATION_PASSES {
        let mut call_sites = Vec::new();
        for &id in &frontier {
            if let Some(func) = arena.get(id).as_function() {
                if let Some(body) = func.body() {
                    collect_explicit_template_calls(&body, &mut call_sites);
                }
            }
        }
        if call_sites.is_empty() {
            break;
        }

        let mut fresh = Vec::new();
        for (name, args) in call_sites {
            let Some(&template_id) = templates_by_name.get(&name) else { continue };
            match cxx_sema::instantiate_function_template(ctx, arena, interner, stream, template_id, &args) {
                Outcome::Ok(id) => fresh.push(id),
                Outcome::Soft { .. } => {}
                Outcome::Hard(diag) => return Err(anyhow!("instantiating `{}`: {}", interner.resolve(name), diag.message)),
            }
        }
        if fresh.is_empty() {
            break;
        }
        instantiated.extend(fresh.iter().copied());
        frontier = fresh;
    }
    Ok(instantiated)
}

/// Result of compiling one translation unit: the object bytes, plus a
/// count of functions lowered, useful for tests and for `-v` logging.
pub struct CompileOutput {
    pub object_bytes: Vec<u8>,
    pub functions_compiled: usize,
    pub target: ObjectTarget,
}

/// Emits a vtable and an RTTI descriptor for every class that has at least
/// one virtual function, ABI-appropriate for `abi`. Skipped entirely for
/// classes with no virtual methods, matching the no-vtable-pointer layout
/// `registry_build` already gives them.
fn emit_type_descriptors(
    arena: &AstArena,
    types: &cxx_sema::TypeRegistry,
    abi: Abi,
    writer: &mut ObjectWriter,
) -> Result<()> {
    for (_, info) in types.iter() {
        let Some(s) = info.as_struct() else { continue };
        if s.vtable.is_empty() {
            continue;
        }
        let Some(class_id) = info.origin else { continue };
        let Some(class) = arena.get(class_id).as_class() else { continue };

        let slots: Vec<Symbol> = s
            .vtable
            .iter()
            .filter_map(|&decl_id| arena.get(decl_id).as_function())
            .map(|f| f.mangled_name().unwrap_or(f.name))
            .collect();
        let layout = VtableLayout { class: class_id, class_name: class.name, slots };
        writer.add_vtable(&layout).context("emitting vtable")?;

        match abi {
            Abi::MsvcV6 => {
                writer.add_rtti_msvc(class.name);
            }
            Abi::Itanium => {
                let any_non_public_or_virtual =
                    s.bases.iter().any(|b| b.is_virtual || b.access != cxx_ast::Access::Public);
                let kind = cxx_eh::itanium::type_info_kind(s.bases.len(), any_non_public_or_virtual);
                let base_symbols: Vec<Symbol> = s
                    .bases
                    .iter()
                    .filter_map(|b| types.get(b.base).origin)
                    .filter_map(|id| arena.get(id).as_class())
                    .map(|c| c.name)
                    .collect();
                writer.add_rtti_itanium(class.name, kind, &base_symbols);
            }
        }
    }
    Ok(())
}

/// Builds and writes one function's EH metadata: the `FuncInfo`/try-map/
/// ip-to-state tables for MSVC targets, deferring the shared `.eh_frame`
/// stream for Itanium targets to the caller (one CIE covers a whole
/// translation unit, so its FDEs are batched across every function first).
fn emit_seh_tables(writer: &mut ObjectWriter, interner: &Interner, mangled: Symbol, machine_fn: &cxx_codegen::MachineFunction) -> Result<()> {
    let (try_blocks, ip_to_state) = cxx_eh::SehStateBuilder::new().build(&machine_fn.eh_markers);
    let func_info = FuncInfo::new(&machine_fn.frame, try_blocks.len() as u32, ip_to_state.len() as u32);
    let name = interner.resolve(mangled);

    writer
        .add_eh_blob(".xdata", &format!("$funcinfo${name}"), &func_info.to_bytes())
        .context("writing FuncInfo")?;
    writer
        .add_eh_blob(".xdata", &format!("$trymap${name}"), &encode_try_block_map(&try_blocks))
        .context("writing try-block map")?;
    writer
        .add_eh_blob(".xdata", &format!("$ipstate${name}"), &encode_ip_to_state_map(&ip_to_state))
        .context("writing ip-to-state map")?;
    Ok(())
}

/// Runs the full pipeline over `source` and returns the finished object
/// bytes without touching the filesystem — the part of `compile` that is
/// actually worth unit-testing.
pub fn compile_source(display_path: &Path, source: &str, target: Option<&str>, debug: bool) -> Result<CompileOutput> {
    let interner = Interner::new();
    let arena = AstArena::new();
    let (global_id, mut stream) = parse_source_with_stream(display_path, source, &arena, &interner)?;

    let (object_target, convention) = resolve_target(target);
    let abi = if matches!(object_target, ObjectTarget::CoffWin64) { Abi::MsvcV6 } else { Abi::Itanium };
    let long_is_64 = !matches!(object_target, ObjectTarget::CoffWin64);

    let mut ctx = SemaContext::new();
    ctx.types = cxx_sema::registry_build::populate_from_ast(&arena, &interner, global_id, long_is_64);

    let mut function_ids = Vec::new();
    collect_functions(&arena, global_id, &mut function_ids);
    let instantiated = instantiate_explicit_calls(&ctx, &arena, &interner, &mut stream, global_id, &function_ids)?;
    if !instantiated.is_empty() {
        info!("{} explicit template instantiation(s) in {}", instantiated.len(), display_path.display());
        function_ids.extend(instantiated);
    }
    info!("{} function(s) to lower in {}", function_ids.len(), display_path.display());

    mangle_functions(&arena, &interner, abi, &function_ids);

    let mut diagnostics = DiagnosticEngine::new();
    cxx_sema::check_access_violations(&arena, &interner, global_id, &function_ids, &mut diagnostics);
    if diagnostics.has_errors() {
        diagnostics.print_all(source);
        return Err(anyhow!(
            "{} access violation(s) in {}",
            diagnostics.error_count(),
            display_path.display()
        ));
    }

    let prologue = if debug { ProloguKind::CppEh } else { ProloguKind::NonEh };
    let runtime = RuntimeSymbols::new(&interner);

    let mut writer = ObjectWriter::new(object_target, &interner);
    emit_type_descriptors(&arena, &ctx.types, abi, &mut writer)?;

    let mut itanium_code_lengths = Vec::new();
    for &id in &function_ids {
        let func = arena
            .get(id)
            .as_function()
            .ok_or_else(|| anyhow!("internal error: collected a non-function declaration"))?;
        let irs = cxx_ir::lower_function(func, &interner, &arena, &ctx.types)
            .with_context(|| format!("lowering `{}`", interner.resolve(func.name)))?;

        for ir in &irs {
            let machine_fn = cxx_codegen::encode_function(ir, &interner, &runtime, convention, prologue)
                .with_context(|| format!("encoding `{}`", interner.resolve(ir.name)))?;

            if !machine_fn.eh_markers.is_empty() {
                match abi {
                    Abi::MsvcV6 => emit_seh_tables(&mut writer, &interner, ir.name, &machine_fn)?,
                    Abi::Itanium => itanium_code_lengths.push(machine_fn.code.len() as u64),
                }
            }

            writer.add_function(&machine_fn).with_context(|| format!("writing `{}`", interner.resolve(ir.name)))?;
        }
    }

    if !itanium_code_lengths.is_empty() {
        let eh_frame = cxx_eh::write_eh_frame_for_functions(&itanium_code_lengths).context("writing .eh_frame")?;
        writer.add_eh_blob(".eh_frame", "$eh_frame", &eh_frame).context("writing .eh_frame")?;
    }

    let functions_compiled = function_ids.len();
    let object_bytes = writer.finish().context("serializing object file")?;
    Ok(CompileOutput { object_bytes, functions_compiled, target: object_target })
}

/// Compiles `input` and writes the resulting object file to `output`
/// (or `input` with its extension swapped for `.o`/`.obj`).
pub fn compile(input: &Path, output: Option<&Path>, target: Option<&str>, debug: bool) -> Result<PathBuf> {
    let source = read_source(input)?;
    let result = compile_source(input, &source, target, debug)?;

    let default_ext = if matches!(result.target, ObjectTarget::CoffWin64) { "obj" } else { "o" };
    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension(default_ext));
    fs::write(&output_path, &result.object_bytes).with_context(|| format!("writing {}", output_path.display()))?;
    info!("wrote {}", output_path.display());
    Ok(output_path)
}

/// Lowers every function in `input` to IR and prints its instruction
/// stream, one function per block.
pub fn emit_ir(input: &Path) -> Result<()> {
    let source = read_source(input)?;
    let interner = Interner::new();
    let arena = AstArena::new();
    let global_id = parse_source(input, &source, &arena, &interner)?;

    let types = cxx_sema::registry_build::populate_from_ast(&arena, &interner, global_id, true);

    let mut function_ids = Vec::new();
    collect_functions(&arena, global_id, &mut function_ids);
    mangle_functions(&arena, &interner, Abi::Itanium, &function_ids);
    for id in function_ids {
        let func = arena.get(id).as_function().expect("collect_functions only yields functions");
        let irs = cxx_ir::lower_function(func, &interner, &arena, &types)
            .with_context(|| format!("lowering `{}`", interner.resolve(func.name)))?;
        for ir in &irs {
            println!("function {}:", interner.resolve(ir.name));
            for instr in &ir.instructions {
                println!("  {:?}", instr.op);
            }
        }
    }
    Ok(())
}

/// Parses `input` and prints its AST, either as a debug dump or as JSON
/// (currently just the function roster; the full tree's `RefCell`/`Cell`
/// fields don't round-trip through serde without a custom visitor).
pub fn emit_ast(input: &Path, json: bool) -> Result<()> {
    let source = read_source(input)?;
    let interner = Interner::new();
    let arena = AstArena::new();
    let global_id = parse_source(input, &source, &arena, &interner)?;

    if json {
        let mut functions = Vec::new();
        collect_functions(&arena, global_id, &mut functions);
        let mut names = Vec::new();
        for id in functions {
            let func = arena.get(id).as_function().expect("collect_functions only yields functions");
            names.push(interner.resolve(func.name).to_string());
        }
        let value = serde_json::json!({ "file": input.display().to_string(), "functions": names });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{:#?}", arena.get(global_id));
    }
    Ok(())
}
