//! 工具层：浏览器动作、动作目录、执行器与 Actuator 实现

pub mod action;
pub mod actuator;
pub mod executor;
pub mod mock;
pub mod outcome;
pub mod schema;
pub mod snapshot;

#[cfg(feature = "browser")]
pub mod browser;

pub use action::{Action, ActionKind, ActionRequest};
pub use actuator::{Actuator, ActuatorFactory, ActuatorHandle, ActuatorReport, ActuatorResult};
pub use executor::ActionExecutor;
pub use mock::{MockActuator, MockActuatorFactory, MockProbe};
pub use outcome::{ActionError, ActionOutcome, OutcomeStatus};
pub use schema::action_catalog;
pub use snapshot::{ElementBox, PageElement, PageSnapshot};

#[cfg(feature = "browser")]
pub use browser::{ChromeActuator, ChromeActuatorFactory, ChromeOptions};
