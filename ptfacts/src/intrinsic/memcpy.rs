use crate::{
    FactResult, fact,
    intrinsic::{CallSite, IntrinsicCall, MatchResult, ResolvedCall},
    program::FactProgram,
    schema::rel,
    walker::FactWalker,
};

/// `memcpy`-like calls: the pointers stored in the source region flow into
/// the destination region. The call returns its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCopy {
    symbols: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for MemoryCopy {
    fn default() -> Self {
        Self {
            symbols: vec!["memcpy".to_string(), "memmove".to_string()],
            prefixes: vec!["llvm.memcpy.".to_string(), "llvm.memmove.".to_string()],
        }
    }
}

impl IntrinsicCall for MemoryCopy {
    fn name(&self) -> &str {
        "memory_copy"
    }

    fn matches(&self, site: &CallSite<'_>) -> Option<MatchResult> {
        let callee = site.callee_name()?;
        let known = self.symbols.iter().any(|symbol| symbol == callee)
            || self.prefixes.iter().any(|prefix| callee.starts_with(prefix.as_str()));
        (known && site.invoke.args.len() >= 2).then_some(MatchResult::default())
    }

    fn generate(
        &self,
        _walker: &FactWalker<'_>,
        program: &mut FactProgram,
        site: &CallSite<'_>,
        call: &ResolvedCall,
    ) -> FactResult<()> {
        let [destination, source, ..] = call.args.as_slice() else {
            return Ok(());
        };
        program.append(&rel::MEM_COPY, fact![call.id, *destination, *source])?;
        if site.invoke.dest.is_some() {
            program.append(&rel::MOVE, fact![call.id, *destination])?;
        }
        Ok(())
    }
}
