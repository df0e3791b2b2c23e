use crate::{
    FactResult, fact,
    intrinsic::{CallSite, IntrinsicCall, MatchResult, ResolvedCall},
    program::FactProgram,
    schema::rel,
    walker::FactWalker,
};

/// Calls to allocation functions. Each call owns one affiliated object, the
/// heap object whose address it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapAllocator {
    symbols: Vec<String>,
}

impl HeapAllocator {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

impl IntrinsicCall for HeapAllocator {
    fn name(&self) -> &str {
        "heap_allocator"
    }

    fn matches(&self, site: &CallSite<'_>) -> Option<MatchResult> {
        let callee = site.callee_name()?;
        // A discarded allocation cannot be pointed to.
        site.invoke.dest?;
        self.symbols
            .iter()
            .any(|symbol| symbol == callee)
            .then_some(MatchResult { affiliated: 1 })
    }

    fn generate(
        &self,
        walker: &FactWalker<'_>,
        program: &mut FactProgram,
        _site: &CallSite<'_>,
        call: &ResolvedCall,
    ) -> FactResult<()> {
        let object = walker.affiliated_id(call.id, 1)?;
        program.append(&rel::HEAP_ALLOC, fact![call.id, object])?;
        program.append(&rel::MEMORY_OBJECT, fact![object, "heap"])?;
        program.append(&rel::ADDRESS_OF, fact![call.id, object])?;
        Ok(())
    }
}
