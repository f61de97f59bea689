//! Role-based permission checks.
//!
//! Permissions are a static function of the caller's [`Role`]:
//!
//! | Role             | Records (contacts, deals, ...)  | Users                      | Dashboard |
//! |------------------|---------------------------------|----------------------------|-----------|
//! | `admin`          | everything                      | everything                 | all       |
//! | `jefe_comercial` | everything                      | read all, update own       | all       |
//! | `user`           | read all, create/update/delete own | read all, update own    | own       |
//!
//! "Own" means the caller is one of the record's stakeholders: its owner, or for tasks and
//! tickets its assignee or creator.
//!
//! Handlers gate whole endpoints with the [`RequiresPermission`] extractor and use
//! [`check_record_access`] once they have loaded the record they are about to change.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::{Error, Result},
    types::{Operation, Permission, Resource, UserId},
};

/// Whether `role` grants `operation` on `resource`.
pub fn role_has_permission(role: Role, resource: Resource, operation: Operation) -> bool {
    use Operation::*;

    match role {
        Role::Admin => true,
        Role::JefeComercial => match resource {
            Resource::Users => matches!(operation, ReadAll | ReadOwn | UpdateOwn),
            _ => true,
        },
        Role::User => match resource {
            Resource::Users => matches!(operation, ReadAll | ReadOwn | UpdateOwn),
            Resource::Dashboard => matches!(operation, ReadOwn),
            r if r.is_record() => matches!(operation, ReadAll | ReadOwn | CreateOwn | UpdateOwn | DeleteOwn),
            _ => false,
        },
    }
}

pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    role_has_permission(user.role, resource, operation)
}

pub fn can_read_all_resources(user: &CurrentUser, resource: Resource) -> bool {
    has_permission(user, resource, Operation::ReadAll)
}

/// Check that `user` may apply `operation` to a record whose stakeholders are `stakeholders`.
///
/// `operation` is the `*Own` flavour; the `*All` flavour of it always suffices.
pub fn check_record_access(
    user: &CurrentUser,
    resource: Resource,
    operation: Operation,
    record_id: impl std::fmt::Display,
    stakeholders: &[UserId],
) -> Result<()> {
    let widened = operation.widened();
    if has_permission(user, resource, widened) {
        return Ok(());
    }
    if stakeholders.contains(&user.id) && has_permission(user, resource, operation) {
        return Ok(());
    }

    Err(Error::InsufficientPermissions {
        required: Permission::Any(vec![
            Permission::Allow(resource, widened),
            Permission::Allow(resource, operation),
        ]),
        action: operation,
        resource: format!("{resource} {record_id}"),
    })
}

/// Check that `user` may set a record's owner to `owner`. Giving a record to someone else needs
/// the `*All` flavour of `operation`.
pub fn check_owner_assignment(user: &CurrentUser, resource: Resource, operation: Operation, owner: Option<UserId>) -> Result<()> {
    match owner {
        Some(owner) if owner != user.id => {
            let widened = operation.widened();
            if has_permission(user, resource, widened) {
                Ok(())
            } else {
                Err(Error::InsufficientPermissions {
                    required: Permission::Allow(resource, widened),
                    action: widened,
                    resource: format!("{resource} owned by another user"),
                })
            }
        }
        _ => Ok(()),
    }
}

/// Marker types naming a [`Resource`] at the type level.
pub trait ResourceMarker: Send + Sync + 'static {
    const RESOURCE: Resource;
}

/// Marker types naming an [`Operation`] at the type level.
pub trait OperationMarker: Send + Sync + 'static {
    const OPERATION: Operation;
}

macro_rules! markers {
    ($trait:ident, $konst:ident, $target:ident, [$($name:ident),+ $(,)?]) => {
        $(
            pub struct $name;
            impl super::$trait for $name {
                const $konst: crate::types::$target = crate::types::$target::$name;
            }
        )+
    };
}

pub mod resource {
    markers!(
        ResourceMarker,
        RESOURCE,
        Resource,
        [Users, Companies, Contacts, Deals, Tasks, Activities, Campaigns, Automations, Tickets, Subscriptions, Payments, Dashboard]
    );
}

pub mod operation {
    markers!(
        OperationMarker,
        OPERATION,
        Operation,
        [CreateAll, CreateOwn, ReadAll, ReadOwn, UpdateAll, UpdateOwn, DeleteAll, DeleteOwn]
    );
}

/// Extractor that authenticates the caller and requires `O` on `R`.
///
/// Derefs to the [`CurrentUser`].
pub struct RequiresPermission<R, O> {
    user: CurrentUser,
    _marker: PhantomData<fn() -> (R, O)>,
}

impl<R, O> RequiresPermission<R, O> {
    pub fn into_inner(self) -> CurrentUser {
        self.user
    }
}

impl<R, O> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &CurrentUser {
        &self.user
    }
}

impl<R: ResourceMarker, O: OperationMarker> FromRequestParts<AppState> for RequiresPermission<R, O> {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !has_permission(&user, R::RESOURCE, O::OPERATION) {
            return Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: R::RESOURCE.to_string(),
            });
        }

        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}
