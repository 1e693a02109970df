use anyhow::bail;

use crate::dispatch::{Action, IoMode};
use crate::invocation::Ctx;

pub mod add;
pub mod clear;
pub mod copy;
pub mod edit;
pub mod history;
pub mod ignore;
pub mod info;
pub mod load;
pub mod note;
pub mod paste;
pub mod remove;
pub mod script;
pub mod search;
pub mod show;
pub mod status;
pub mod swap;
pub mod transfer;

/// The (action, io-mode) dispatch table. Combinations that aren't
/// listed are user errors, not panics.
pub async fn perform(ctx: &mut Ctx) -> anyhow::Result<()> {
    use Action::*;
    use IoMode::*;

    match (ctx.action, ctx.io) {
        (Copy | Cut, File) => copy::files(ctx).await,
        (Copy | Cut, Pipe) => copy::pipe_in(ctx).await,
        (Copy | Cut, Text) => copy::text(ctx).await,

        (Paste, Text) | (Paste, File) => paste::files(ctx).await,
        (Paste, Pipe) => paste::pipe_out(ctx).await,

        (Add, File) => add::files(ctx).await,
        (Add, Pipe) | (Add, Text) => add::data(ctx).await,

        (Clear, Text) => clear::run(ctx).await,

        (Show, Pipe) => show::filepaths(ctx),
        (Show, Text) => show::run(ctx).await,

        (Edit, Text) => edit::run(ctx).await,

        (Remove, Text) | (Remove, Pipe) => remove::run(ctx).await,

        (Note, Pipe) => note::pipe(ctx).await,
        (Note, Text) => note::text(ctx).await,

        (Swap, Text) => swap::run(ctx).await,

        (Status, Pipe) => status::json(ctx),
        (Status, Text) => status::run(ctx).await,

        (Info, Pipe) => info::json(ctx),
        (Info, Text) => info::run(ctx).await,

        (Load, Text) => load::run(ctx).await,

        (Import, Text) => transfer::import(ctx).await,
        (Export, Text) => transfer::export(ctx).await,

        (History, Pipe) => history::json(ctx),
        (History, Text) => history::run(ctx).await,

        (Ignore, Text) | (Ignore, Pipe) => ignore::run(ctx).await,

        (Search, Pipe) => search::json(ctx),
        (Search, Text) => search::run(ctx).await,

        (Script, _) => script::run(ctx).await,

        (action, io) => bail!(
            "the {} action doesn't support this kind of redirection ({io:?})",
            ctx.catalog.name(action)
        ),
    }
}
