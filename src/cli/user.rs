//! tb profile / tb user

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{ProfilePatch, User};
use crate::output::HumanOutput;

use super::{CommonOptions, Context};

/// Options for `tb profile update`
pub struct ProfileUpdateOptions {
    pub name: Option<String>,
    pub email: Option<String>,
    pub common: CommonOptions,
}

/// Options for `tb user switch`
pub struct SwitchOptions {
    pub email: String,
    pub common: CommonOptions,
}

#[derive(Serialize)]
struct UserListReport {
    users: Vec<UserRow>,
}

#[derive(Serialize)]
struct UserRow {
    #[serde(flatten)]
    user: User,
    active: bool,
}

pub fn run_profile_show(common: CommonOptions) -> Result<()> {
    let ctx = Context::open(&common)?;
    let user = ctx.runtime.block_on(ctx.app.session().profile())?;

    let mut human = HumanOutput::new(format!("tb profile: {}", user.name));
    human.push_summary("email", user.email.clone());
    human.push_summary("id", user.id.clone());
    ctx.finish("profile show", &user, human)
}

pub fn run_profile_update(options: ProfileUpdateOptions) -> Result<()> {
    if options.name.is_none() && options.email.is_none() {
        return Err(Error::InvalidArgument(
            "pass --name and/or --email".to_string(),
        ));
    }
    let ctx = Context::open(&options.common)?;
    let patch = ProfilePatch {
        name: options.name,
        email: options.email,
    };
    let user = ctx
        .runtime
        .block_on(ctx.app.session().update_profile(patch))?;
    ctx.emit_session_changed();

    let mut human = HumanOutput::new("tb profile update: saved");
    human.push_summary("name", user.name.clone());
    human.push_summary("email", user.email.clone());
    human.push_detail("existing comments keep the name they were written under");
    ctx.finish("profile update", &user, human)
}

pub fn run_list(common: CommonOptions) -> Result<()> {
    let ctx = Context::open(&common)?;
    let active = ctx.app.current_user().map(|user| user.id);
    let users = ctx.runtime.block_on(ctx.app.session().list_users())?;

    let mut human = HumanOutput::new(format!("tb user list: {} user(s)", users.len()));
    for user in &users {
        let marker = if active.as_deref() == Some(user.id.as_str()) {
            "*"
        } else {
            " "
        };
        human.push_detail(format!("{marker} {} <{}>", user.name, user.email));
    }
    if users.is_empty() {
        human.push_next_step("tb signup <email> --name <name>");
    }

    let report = UserListReport {
        users: users
            .into_iter()
            .map(|user| UserRow {
                active: active.as_deref() == Some(user.id.as_str()),
                user,
            })
            .collect(),
    };
    ctx.finish("user list", &report, human)
}

pub fn run_switch(options: SwitchOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    let user = ctx.runtime.block_on(ctx.app.switch_user(&options.email))?;
    ctx.emit_session_changed();

    let mut human = HumanOutput::new(format!("tb user switch: now {}", user.name));
    human.push_summary("email", user.email.clone());
    human.push_summary("tasks", ctx.app.store().tasks().len().to_string());
    ctx.finish("user switch", &user, human)
}
