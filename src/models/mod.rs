// Models module - Database entity representations

pub mod class;
pub mod equipment;
pub mod login;
pub mod member;
pub mod payment;
pub mod scheme;
pub mod trainer;
pub mod types;
pub mod workout;

pub use class::{ClassSummary, GymClass, WorkoutPlan};
pub use equipment::Equipment;
pub use login::{LoginAccount, Role};
pub use member::{Member, MembershipStatus};
pub use payment::{Payment, PaymentMethod};
pub use scheme::Scheme;
pub use trainer::Trainer;
pub use types::Gender;
pub use workout::Workout;
