//! Users and the actors operations are performed as.
//!
//! Users are supplied by an external identity provider; this crate only reads
//! their id and role.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// What a user is allowed to do.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  Citizen,
  Admin,
  Moderator,
}

impl Role {
  /// Admins and moderators may change status, respond and annotate.
  pub fn is_staff(self) -> bool { matches!(self, Self::Admin | Self::Moderator) }
}

/// A registered user as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:           String,
  pub name:         String,
  pub email:        String,
  pub role:         Role,
  pub phone:        Option<String>,
  pub county:       Option<String>,
  pub constituency: Option<String>,
  pub ward:         Option<String>,
}

impl User {
  pub fn actor(&self) -> Actor {
    Actor {
      user_id: self.id.clone(),
      role:    self.role,
    }
  }
}

/// The identity a store operation is performed as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id: String,
  pub role:    Role,
}

impl Actor {
  pub fn new(user_id: impl Into<String>, role: Role) -> Self {
    Self {
      user_id: user_id.into(),
      role,
    }
  }

  pub fn is_staff(&self) -> bool { self.role.is_staff() }

  /// Fail with [`Error::Unauthorized`] unless this actor is staff.
  pub fn require_staff(&self, action: &'static str) -> Result<()> {
    if self.is_staff() {
      Ok(())
    } else {
      Err(Error::Unauthorized {
        user_id: self.user_id.clone(),
        role: self.role,
        action,
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_admins_and_moderators_are_staff() {
    assert!(Actor::new("a", Role::Admin).require_staff("x").is_ok());
    assert!(Actor::new("m", Role::Moderator).require_staff("x").is_ok());

    let err = Actor::new("c", Role::Citizen)
      .require_staff("change status")
      .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { role: Role::Citizen, .. }));
    assert_eq!(err.to_string(), "citizen \"c\" may not change status");
  }

  #[test]
  fn role_parses_from_lowercase() {
    assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
    assert!("root".parse::<Role>().is_err());
  }
}
