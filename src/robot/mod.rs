pub mod actuator;
pub mod mapper;
pub mod receiver;

pub use actuator::{Actuator, LoggingActuator, StiffnessGuard};
pub use mapper::{ActuatorCommand, JointCommandMapper, JointRange};
pub use receiver::{run_session, RobotReceiver, SessionStats};
