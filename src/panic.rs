use log::*;
use std::any::Any;
use std::fmt::Write;
use std::panic::{self, AssertUnwindSafe};

pub fn setup_panic_hook() {
    panic::set_hook(Box::new(panic_hook));
}

fn panic_hook(info: &panic::PanicHookInfo) {
    let mut fmt_error = String::new();
    let _ = writeln!(fmt_error, "{}", info);

    error!("{}", fmt_error);
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Run one unit of work so that a panic inside it is logged and contained. The rest of the tick
/// carries on with the next operation or subsystem.
pub fn bulkhead<R>(label: &str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Some(result),
        Err(payload) => {
            error!("Failure in {}: {}", label, panic_message(payload.as_ref()));

            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulkhead_contains_panics() {
        let mut after = false;

        let failed: Option<u32> = bulkhead("exploding", || panic!("boom"));
        let worked = bulkhead("fine", || {
            after = true;
            7
        });

        assert_eq!(failed, None);
        assert_eq!(worked, Some(7));
        assert!(after);
    }

    #[test]
    fn messages_are_extracted_from_payloads() {
        let result = panic::catch_unwind(|| panic!("value was {}", 3));

        let payload = result.err().unwrap();

        assert_eq!(panic_message(payload.as_ref()), "value was 3");
    }
}
