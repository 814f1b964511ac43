//! Stack growth for deep recursion.
//!
//! Evaluation recurses once per nested expression, statement and script
//! call. `stacker` grows the stack on demand so deeply nested programs and
//! deep script recursion do not overflow the thread stack (goroutine threads
//! included, which start with the platform default).

/// Run `f`, growing the stack first if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Remaining space below which the stack is grown (128KB).
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each new stack segment (2MB).
    const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack; call straight through.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::ensure_sufficient_stack;

    fn depth(n: u64) -> u64 {
        if n == 0 {
            0
        } else {
            ensure_sufficient_stack(|| 1 + depth(n - 1))
        }
    }

    #[test]
    fn deep_recursion_completes() {
        assert_eq!(depth(200_000), 200_000);
    }
}
