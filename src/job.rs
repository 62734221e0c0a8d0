use std::any::{self, Any};
use std::fmt;
use std::vec;

use crate::error::ArgumentMismatch;
use crate::Result;

type Thunk = Box<dyn FnOnce() + Send + 'static>;

/// A unit of deferred work.
///
/// A job owns everything it needs to run. It has no return channel: results
/// must flow through state the caller owns (a channel, a shared slot, ...).
///
/// The default job is empty. Executors discard empty jobs silently without
/// taking any capacity.
#[derive(Default)]
pub struct Job {
    thunk: Option<Thunk>,
}

impl Job {
    /// Creates a job from a closure that already captured its arguments.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Job {
            thunk: Some(Box::new(f)),
        }
    }

    /// Creates an empty job, which no executor will ever run.
    pub fn empty() -> Self {
        Job::default()
    }

    /// Binds a callable to a tuple of arguments.
    ///
    /// The argument tuple must match the callable's parameters exactly,
    /// which the compiler checks.
    ///
    /// ```
    /// use bounded_exec::Job;
    ///
    /// let job = Job::bind(|n: i32, s: String| assert_eq!(s, n.to_string()), (1, "1".to_owned()));
    /// job.execute();
    /// ```
    pub fn bind<F, Args>(f: F, args: Args) -> Self
    where
        F: Callable<Args>,
    {
        f.bind(args)
    }

    /// Binds a callable to loosely typed values.
    ///
    /// The number of values and the type of each one are checked against the
    /// callable's parameters here, so a job built by this function can never
    /// fail on argument shape when it runs.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ArgumentMismatch`](crate::ExecutorError::ArgumentMismatch)
    /// when the values don't fit the callable.
    pub fn with_values<F, Args>(f: F, values: Vec<Value>) -> Result<Self>
    where
        F: Callable<Args>,
    {
        Ok(f.bind_values(values)?)
    }

    /// Returns `true` if this job has nothing to run.
    pub fn is_empty(&self) -> bool {
        self.thunk.is_none()
    }

    /// Runs the job on the current thread.
    pub fn execute(self) {
        if let Some(thunk) = self.thunk {
            thunk();
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("empty", &self.is_empty())
            .finish()
    }
}

/// A dynamically typed argument for [`Job::with_values`].
pub struct Value {
    inner: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a value, remembering its type name for error reporting.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Value {
            inner: Box::new(value),
            type_name: any::type_name::<T>(),
        }
    }

    /// Name of the wrapped value's type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn downcast<T: Any>(self, position: usize) -> std::result::Result<T, ArgumentMismatch> {
        let found = self.type_name;
        self.inner
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ArgumentMismatch::Type {
                position,
                expected: any::type_name::<T>(),
                found,
            })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

/// A callable that can be bound to arguments of shape `Args`.
///
/// Implemented for every `FnOnce` of up to six parameters.
pub trait Callable<Args>: Sized + Send + 'static {
    /// Number of parameters the callable declares.
    const ARITY: usize;

    /// Binds statically typed arguments.
    fn bind(self, args: Args) -> Job;

    /// Binds dynamically typed values, checking arity and types.
    fn bind_values(self, values: Vec<Value>) -> std::result::Result<Job, ArgumentMismatch>;
}

fn take<T: Any>(
    values: &mut vec::IntoIter<Value>,
    position: usize,
    arity: usize,
) -> std::result::Result<T, ArgumentMismatch> {
    match values.next() {
        Some(value) => value.downcast(position),
        None => Err(ArgumentMismatch::Arity {
            expected: arity,
            found: position,
        }),
    }
}

macro_rules! one {
    ($arg:ident) => {
        1
    };
}

macro_rules! impl_callable {
    ($($arg:ident),*) => {
        impl<Func, $($arg,)*> Callable<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) + Send + 'static,
            $($arg: Any + Send,)*
        {
            const ARITY: usize = 0 $(+ one!($arg))*;

            #[allow(non_snake_case)]
            fn bind(self, args: ($($arg,)*)) -> Job {
                let ($($arg,)*) = args;
                Job::new(move || self($($arg),*))
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn bind_values(self, values: Vec<Value>) -> std::result::Result<Job, ArgumentMismatch> {
                let arity = <Self as Callable<($($arg,)*)>>::ARITY;
                if values.len() != arity {
                    return Err(ArgumentMismatch::Arity {
                        expected: arity,
                        found: values.len(),
                    });
                }
                let mut values = values.into_iter();
                let mut position = 0;
                $(
                    let $arg: $arg = take(&mut values, position, arity)?;
                    position += 1;
                )*
                Ok(Job::new(move || self($($arg),*)))
            }
        }
    };
}

impl_callable!();
impl_callable!(A);
impl_callable!(A, B);
impl_callable!(A, B, C);
impl_callable!(A, B, C, D);
impl_callable!(A, B, C, D, E);
impl_callable!(A, B, C, D, E, G);
