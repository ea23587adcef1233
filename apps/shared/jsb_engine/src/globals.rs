//! Native functions exposed on the global object

use rquickjs::function::IntoJsFunc;
use rquickjs::{Ctx, Function};
use tracing::trace;

/// Install a native callback on the global object under `name`
///
/// The function's `name` property is set to `name` so stack traces read naturally.
/// An existing global with the same name is replaced.
pub fn install_global_function<'js, F, P>(ctx: &Ctx<'js>, name: &str, callback: F) -> rquickjs::Result<()>
where
    F: IntoJsFunc<'js, P> + 'js,
{
    let function = Function::new(ctx.clone(), callback)?.with_name(name)?;
    ctx.globals().set(name, function)?;
    trace!("Installed global function '{}'", name);
    Ok(())
}
