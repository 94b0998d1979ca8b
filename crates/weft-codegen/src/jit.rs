// src/jit.rs

use cranelift::prelude::*;
use cranelift_codegen::isa::TargetFrontendConfig;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use rustc_hash::FxHashMap;

use crate::emit::EmitCtx;
use crate::errors::{CodegenError, CodegenResult};

/// Options for JIT compilation
#[derive(Clone, Copy, Debug, Default)]
pub struct JitOptions {
    /// Release mode: disable the IR verifier
    pub release: bool,
    /// Collect disassembly of every defined function
    pub disasm: bool,
}

impl JitOptions {
    /// Create options for disassembly output
    pub fn disasm() -> Self {
        Self {
            release: false,
            disasm: true,
        }
    }
}

/// JIT compiler context
pub struct JitContext {
    pub module: JITModule,
    pub ctx: codegen::Context,
    /// Functions declared with Export linkage (will be compiled)
    pub func_ids: FxHashMap<String, FuncId>,
    disasm: bool,
    /// Collected disassembly output from compiled functions
    disasm_output: Vec<(String, String)>,
}

impl JitContext {
    /// Create a new JitContext with default (debug) options
    pub fn new() -> Self {
        Self::with_options(JitOptions::default())
    }

    /// Create a new JitContext with the specified options
    pub fn with_options(options: JitOptions) -> Self {
        // Build JIT module with native ISA
        let mut flag_builder = settings::builder();
        flag_builder
            .set("use_colocated_libcalls", "false")
            .expect("INTERNAL: Cranelift config: invalid 'use_colocated_libcalls' flag");
        flag_builder
            .set("is_pic", "false")
            .expect("INTERNAL: Cranelift config: invalid 'is_pic' flag");
        flag_builder
            .set("opt_level", "speed")
            .expect("INTERNAL: Cranelift config: invalid 'opt_level' flag");

        if options.release {
            flag_builder
                .set("enable_verifier", "false")
                .expect("INTERNAL: Cranelift config: invalid 'enable_verifier' flag");
        }

        let isa_builder = cranelift_native::builder().unwrap_or_else(|msg| {
            panic!("native ISA not available: {}", msg);
        });

        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .expect("INTERNAL: Cranelift config: failed to build ISA from native target");

        let builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        let module = JITModule::new(builder);
        let ctx = module.make_context();

        tracing::debug!(?options, "created JIT context");

        Self {
            module,
            ctx,
            func_ids: FxHashMap::default(),
            disasm: options.disasm,
            disasm_output: Vec::new(),
        }
    }

    /// Get the pointer type for the target
    pub fn pointer_type(&self) -> Type {
        self.module.target_config().pointer_type()
    }

    /// Target description that descriptors build representations for
    pub fn target(&self) -> TargetFrontendConfig {
        self.module.target_config()
    }

    /// Create a function signature with given parameters and return type
    pub fn create_signature(&self, params: &[Type], ret: Option<Type>) -> Signature {
        self.create_signature_multi_return(params, ret.as_slice())
    }

    /// Create a function signature with given parameters and multiple return types.
    pub fn create_signature_multi_return(&self, params: &[Type], returns: &[Type]) -> Signature {
        let mut sig = self.module.make_signature();
        for &param in params {
            sig.params.push(AbiParam::new(param));
        }
        for &ret_type in returns {
            sig.returns.push(AbiParam::new(ret_type));
        }
        sig
    }

    /// Declare a function in the module
    pub fn declare_function(&mut self, name: &str, sig: &Signature) -> CodegenResult<FuncId> {
        let func_id = self
            .module
            .declare_function(name, Linkage::Export, sig)
            .map_err(CodegenError::cranelift)?;
        self.func_ids.insert(name.to_string(), func_id);
        Ok(func_id)
    }

    /// Define a function (after building IR)
    pub fn define_function(&mut self, func_id: FuncId) -> CodegenResult<()> {
        if self.disasm {
            self.ctx.set_disasm(true);
        }

        self.module
            .define_function(func_id, &mut self.ctx)
            .map_err(CodegenError::cranelift)?;

        if self.disasm
            && let Some(compiled) = self.ctx.compiled_code()
            && let Some(vcode) = &compiled.vcode
        {
            let func_name = self
                .func_ids
                .iter()
                .find(|(_, id)| **id == func_id)
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| format!("func_{:?}", func_id));
            self.disasm_output.push((func_name, vcode.clone()));
        }

        Ok(())
    }

    /// Emit, declare and define a function in one go.
    ///
    /// `body` receives an emission context positioned in the entry block and
    /// the entry block's parameters, and returns the values to return. The
    /// name is only declared once the body has been emitted, so a failed body
    /// leaves no trace in the module. If definition fails a newly declared
    /// name is forgotten again; an earlier function of the same name is kept.
    /// Either way the context is reset for the next function.
    pub fn build_function<F>(
        &mut self,
        name: &str,
        params: &[Type],
        returns: &[Type],
        body: F,
    ) -> CodegenResult<FuncId>
    where
        F: FnOnce(&mut EmitCtx<'_, '_>, &[Value]) -> CodegenResult<Vec<Value>>,
    {
        let sig = self.create_signature_multi_return(params, returns);
        self.ctx.func.signature = sig.clone();
        let target = self.target();

        let mut builder_ctx = FunctionBuilderContext::new();
        let emitted = {
            let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut builder_ctx);
            let entry_block = builder.create_block();
            builder.append_block_params_for_function_params(entry_block);
            builder.switch_to_block(entry_block);
            builder.seal_block(entry_block);
            let block_params = builder.block_params(entry_block).to_vec();

            let mut cg = EmitCtx::new(&mut builder, target);
            let results = body(&mut cg, &block_params);
            results.map(|values| {
                builder.ins().return_(&values);
                builder.finalize();
            })
        };

        if let Err(err) = emitted {
            tracing::debug!(function = name, %err, "abandoning function");
            self.clear();
            return Err(err);
        }

        let known = self.func_ids.contains_key(name);
        let func_id = match self.declare_function(name, &sig) {
            Ok(func_id) => func_id,
            Err(err) => {
                self.clear();
                return Err(err);
            }
        };
        let defined = self.define_function(func_id);
        if defined.is_err() && !known {
            self.func_ids.remove(name);
        }
        self.clear();
        defined.map(|()| func_id)
    }

    /// Get collected disassembly output
    pub fn get_disasm(&self) -> &[(String, String)] {
        &self.disasm_output
    }

    /// Finalize all functions and get code pointers
    pub fn finalize(&mut self) -> CodegenResult<()> {
        self.module.finalize_definitions().map_err(|e| {
            CodegenError::internal_with_context("finalization error", format!("{:?}", e))
        })?;

        if std::env::var_os("WEFT_DUMP_FN_PTRS").is_some() {
            for (name, &func_id) in &self.func_ids {
                let ptr = self.module.get_finalized_function(func_id);
                tracing::info!(function = %name, ?ptr, "finalized");
            }
        }

        Ok(())
    }

    /// Get a function pointer by name
    pub fn get_function_ptr(&self, name: &str) -> Option<*const u8> {
        self.func_ids
            .get(name)
            .map(|&func_id| self.module.get_finalized_function(func_id))
    }

    /// Clear the context for reuse
    pub fn clear(&mut self) {
        self.module.clear_context(&mut self.ctx);
    }
}

impl Default for JitContext {
    fn default() -> Self {
        Self::new()
    }
}
