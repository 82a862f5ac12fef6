//! The interceptable prop pipeline.
//!
//! Every prop assignment travels through the node's ordered hook chain
//! before it commits. A hook receives the in-flight record plus a
//! continuation; it may mutate the record and call the continuation,
//! replace the record wholesale, or swallow the assignment by not calling
//! the continuation at all. Hook order is registration order across all
//! applied plugins and features, stable for the lifetime of the node.

use std::rc::Rc;

use formtree_model::PropValue;

/// The in-flight prop assignment.
#[derive(Debug, Clone)]
pub struct PropRecord {
    pub prop: String,
    pub value: PropValue,
}

impl PropRecord {
    pub fn new(prop: impl Into<String>, value: PropValue) -> Self {
        Self {
            prop: prop.into(),
            value,
        }
    }
}

/// Continuation handed to each hook.
pub type Next<'a> = dyn FnMut(PropRecord) -> Option<PropRecord> + 'a;

/// A middleware hook over prop assignments.
///
/// Returning `None` without invoking `next` swallows the assignment;
/// returning `next`'s result (possibly after mutating the record)
/// continues the chain.
pub type PropHook = Rc<dyn Fn(PropRecord, &mut Next<'_>) -> Option<PropRecord>>;

/// Run a record through the hook chain. `Some` is the committed record,
/// `None` means a hook swallowed the assignment.
pub fn run_hooks(hooks: &[PropHook], record: PropRecord) -> Option<PropRecord> {
    dispatch(hooks, 0, record)
}

fn dispatch(hooks: &[PropHook], index: usize, record: PropRecord) -> Option<PropRecord> {
    match hooks.get(index) {
        None => Some(record),
        Some(hook) => {
            let hook = Rc::clone(hook);
            hook(record, &mut |next_record| {
                dispatch(hooks, index + 1, next_record)
            })
        }
    }
}
