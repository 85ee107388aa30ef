#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs the pipeline stages, either on the rayon thread pool or on the
/// calling thread.
///
/// Every method returns only once all the work it was given is complete:
/// each call is a barrier. Results are always in input order, so both modes
/// produce the same output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskRunner {
    parallel: bool,
}

impl TaskRunner {
    /// A runner using the thread pool if `parallel` is set and the
    /// `parallel` feature is enabled.
    pub fn new(parallel: bool) -> Self {
        Self {
            parallel: parallel && cfg!(feature = "parallel"),
        }
    }

    /// A runner executing everything on the calling thread.
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    /// Whether work is distributed over the thread pool.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Applies `f` to every item and collects the results in order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if self.parallel {
            return items.par_iter().enumerate().map(|(i, item)| f(i, item)).collect();
        }

        items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
    }

    /// Applies `f` to every item in place.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if self.parallel {
            items.par_iter_mut().enumerate().for_each(|(i, item)| f(i, item));
            return;
        }

        items.iter_mut().enumerate().for_each(|(i, item)| f(i, item));
    }

    /// Runs two tasks, concurrently when parallel, and waits for both.
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        #[cfg(feature = "parallel")]
        if self.parallel {
            return rayon::join(a, b);
        }

        (a(), b())
    }

    /// Launches one task per item and waits for all of them.
    ///
    /// Tasks run inside a `rayon::scope` so that each may itself use the
    /// fine-grained methods of this runner.
    pub fn run_tasks<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if self.parallel {
            let mut results: Vec<Option<R>> = Vec::with_capacity(items.len());
            results.resize_with(items.len(), || None);
            let f = &f;
            rayon::scope(|scope| {
                for ((i, item), slot) in items.into_iter().enumerate().zip(results.iter_mut()) {
                    scope.spawn(move |_| *slot = Some(f(i, item)));
                }
            });
            return results.into_iter().flatten().collect();
        }

        items.into_iter().enumerate().map(|(i, item)| f(i, item)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::TaskRunner;

    #[test]
    fn both_modes_agree() {
        let items: Vec<u32> = (0..100).collect();
        for runner in [TaskRunner::new(true), TaskRunner::sequential()] {
            let squares = runner.map(&items, |_, x| x * x);
            assert_eq!(squares[7], 49);

            let mut copy = items.clone();
            runner.for_each_mut(&mut copy, |i, x| *x += i as u32);
            assert_eq!(copy[10], 20);

            let tasks = runner.run_tasks(items.clone(), |i, x| (i as u32) + x);
            assert_eq!(tasks, (0..100).map(|x| 2 * x).collect::<Vec<_>>());

            assert_eq!(runner.join(|| 1, || 2), (1, 2));
        }
    }
}
