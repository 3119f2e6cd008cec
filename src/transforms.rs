//! Ready-made transforms, to be chained with `Promise::then()`

use crate::errors::PromiseError;
use std::thread;
use std::time::Duration;


/// Transform which passes its input through after sleeping for some time
///
/// The sleep happens on whichever executor runs the transform, which is tied
/// up for the whole duration.
pub fn delay<T: 'static>(duration: Duration) -> impl FnOnce(T) -> Result<T, PromiseError>
                                          + Send + 'static
{
    move |value| {
        thread::sleep(duration);
        Ok(value)
    }
}
