//! Compilation entry points

use crate::context::Context;
use crate::cse::extract_ctes;
use crate::error::CompileResult;
use crate::formatter::statement::Query;
use crate::formatter::QueryFormatter;
use crate::ir::plan::Plan;
use crate::render::SqlRenderer;
use crate::rewrite::{RewritePassManager, RewriteState};
use relc_core::CompilerConfig;
use relc_sql::{dialect_for, validate_rendered, SqlDialect};

/// Compiles plans to SQL text under one configuration
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `plan` to SQL text.
    ///
    /// Runs the enabled rewrite passes, extracts repeated sub-plans into
    /// CTEs, formats and renders. Either complete text or an error is
    /// returned.
    pub fn compile(&self, plan: &Plan) -> CompileResult<String> {
        let dialect = dialect_for(self.config.dialect);
        let query = self.build_query(plan, dialect.as_ref())?;
        let sql = SqlRenderer::new(dialect.as_ref(), self.config.max_line_width)
            .render_query(&query)?;
        if self.config.validate_output {
            validate_rendered(dialect.as_ref(), &sql)?;
        }
        Ok(sql)
    }

    /// Rewrite and format `plan` without rendering it
    pub fn to_query(&self, plan: &Plan) -> CompileResult<Query> {
        let dialect = dialect_for(self.config.dialect);
        self.build_query(plan, dialect.as_ref())
    }

    fn build_query(&self, plan: &Plan, dialect: &dyn SqlDialect) -> CompileResult<Query> {
        self.config.validate()?;

        let mut state = RewriteState::new(dialect.name());
        let rewritten =
            RewritePassManager::with_defaults().run(plan, &mut state, self.config.passes.as_deref())?;

        let mut ctx = Context::new();
        if self.config.extract_ctes {
            let extracted = extract_ctes(&rewritten, &mut ctx)?;
            log::debug!("extracted {} CTE(s)", extracted);
        }
        QueryFormatter::new(dialect).format_query(&mut ctx, &rewritten)
    }
}

/// Compile `plan` with the default configuration (generic dialect)
pub fn compile(plan: &Plan) -> CompileResult<String> {
    Compiler::default().compile(plan)
}

/// Compile `plan` with `config`
pub fn compile_with(plan: &Plan, config: &CompilerConfig) -> CompileResult<String> {
    Compiler::new(config.clone()).compile(plan)
}
