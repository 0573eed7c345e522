//! tb signup / signin / signout / whoami

use serde::Serialize;

use crate::error::Result;
use crate::model::User;
use crate::output::HumanOutput;

use super::{CommonOptions, Context};

/// Options for `tb signup`
pub struct SignupOptions {
    pub email: String,
    pub name: String,
    pub password: String,
    pub common: CommonOptions,
}

/// Options for `tb signin`
pub struct SigninOptions {
    pub email: String,
    pub password: String,
    pub common: CommonOptions,
}

#[derive(Serialize)]
struct SessionReport {
    user: Option<User>,
    tasks: usize,
}

pub fn run_signup(options: SignupOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    let user = ctx.runtime.block_on(ctx.app.sign_up(
        &options.email,
        &options.password,
        &options.name,
    ))?;
    ctx.emit_session_changed();

    let mut human = HumanOutput::new(format!("tb signup: welcome, {}", user.name));
    human.push_summary("email", user.email.clone());
    human.push_summary("id", user.id.clone());
    human.push_next_step("tb task add \"...\"");
    finish(&ctx, "signup", Some(user), human)
}

pub fn run_signin(options: SigninOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    let user = ctx
        .runtime
        .block_on(ctx.app.sign_in(&options.email, &options.password))?;
    ctx.emit_session_changed();

    let mut human = HumanOutput::new(format!("tb signin: signed in as {}", user.name));
    human.push_summary("email", user.email.clone());
    human.push_summary("tasks", ctx.app.store().tasks().len().to_string());
    human.push_next_step("tb board show");
    finish(&ctx, "signin", Some(user), human)
}

pub fn run_signout(common: CommonOptions) -> Result<()> {
    let mut ctx = Context::open(&common)?;
    let previous = ctx.app.current_user();
    let result = ctx.runtime.block_on(ctx.app.sign_out());
    if previous.is_some() {
        ctx.emit_session_changed();
    }
    result?;

    let header = match &previous {
        Some(user) => format!("tb signout: {} signed out", user.email),
        None => "tb signout: nobody was signed in".to_string(),
    };
    finish(&ctx, "signout", None, HumanOutput::new(header))
}

pub fn run_whoami(common: CommonOptions) -> Result<()> {
    let ctx = Context::open(&common)?;
    let user = ctx.app.current_user();
    let mut human = match &user {
        Some(user) => {
            let mut human = HumanOutput::new(format!("tb whoami: {}", user.name));
            human.push_summary("email", user.email.clone());
            human.push_summary("id", user.id.clone());
            human
        }
        None => {
            let mut human = HumanOutput::new("tb whoami: not signed in");
            human.push_next_step("tb signin <email>");
            human
        }
    };
    if user.is_some() {
        human.push_summary("tasks", ctx.app.store().tasks().len().to_string());
    }
    finish(&ctx, "whoami", user, human)
}

fn finish(ctx: &Context, command: &str, user: Option<User>, human: HumanOutput) -> Result<()> {
    let report = SessionReport {
        tasks: if user.is_some() {
            ctx.app.store().tasks().len()
        } else {
            0
        },
        user,
    };
    ctx.finish(command, &report, human)
}
