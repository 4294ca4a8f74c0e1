mod export;
mod foods;
mod helpers;
mod history;
mod intake;
mod profile;

pub(crate) use export::cmd_export;
pub(crate) use foods::{cmd_categories, cmd_food_add, cmd_foods};
pub(crate) use history::cmd_history;
pub(crate) use intake::{UnitsChange, cmd_add, cmd_day, cmd_manual, cmd_remove, cmd_reset, cmd_units};
pub(crate) use profile::{
    cmd_delete_profile, cmd_goal, cmd_login, cmd_logout, cmd_profiles, cmd_register, cmd_setup,
    cmd_whoami,
};
