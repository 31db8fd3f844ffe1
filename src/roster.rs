//! Class roster operations with role checks.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{ClassForm, ClassRecord, User};
use crate::session;
use crate::store::AppStore;

/// Whether `actor` may edit `class`: admins always, faculty only their own.
pub fn can_edit(actor: &User, class: &ClassRecord) -> bool {
    actor.is_admin() || (actor.is_faculty() && class.faculty_id == actor.id)
}

/// List the classes visible to `actor`, in roster order.
///
/// Faculty see only classes they own.
pub fn list_for<'a>(store: &'a AppStore, actor: &User) -> Vec<&'a ClassRecord> {
    store
        .classes
        .iter()
        .filter(|c| !actor.is_faculty() || c.faculty_id == actor.id)
        .collect()
}

/// Get class by ID.
pub fn get_by_id<'a>(store: &'a AppStore, id: &str) -> Result<&'a ClassRecord> {
    store
        .find_class(id)
        .ok_or_else(|| AppError::not_found(format!("class {id}")))
}

/// Create a new class.
///
/// Faculty actors always own the classes they create.
pub fn create(store: &mut AppStore, actor: &User, form: ClassForm) -> Result<ClassRecord> {
    if !actor.is_staff() {
        warn!("{} {} tried to add a class", actor.role, actor.id);
        return Err(AppError::denied("only admin or faculty can add classes"));
    }
    validate_form(&form)?;

    let id = store.next_class_id("CLS", Utc::now());
    let mut class = ClassRecord::from_form(id, form);
    if actor.is_faculty() {
        class.faculty_id = actor.id.clone();
    }

    info!("Class {} ({}) added by {}", class.id, class.name, actor.id);
    store.classes.push(class.clone());
    Ok(class)
}

/// Update an existing class with every field of `form`.
pub fn update(store: &mut AppStore, actor: &User, id: &str, mut form: ClassForm) -> Result<ClassRecord> {
    validate_form(&form)?;

    let class = store
        .find_class_mut(id)
        .ok_or_else(|| AppError::not_found(format!("class {id}")))?;
    if !can_edit(actor, class) {
        warn!("{} {} tried to edit class {id}", actor.role, actor.id);
        return Err(AppError::denied(format!("{} {} cannot edit class {id}", actor.role, actor.id)));
    }
    if actor.is_faculty() {
        form.faculty_id = actor.id.clone();
    }

    class.apply(form);
    info!("Class {id} updated by {}", actor.id);
    Ok(class.clone())
}

/// Delete a class by ID. Admin only.
///
/// A running session for the class is ended and archived first.
pub fn delete(store: &mut AppStore, actor: &User, id: &str) -> Result<ClassRecord> {
    if !actor.is_admin() {
        warn!("{} {} tried to delete class {id}", actor.role, actor.id);
        return Err(AppError::denied("only admin can delete classes"));
    }
    let pos = store
        .classes
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| AppError::not_found(format!("class {id}")))?;

    session::archive_active(store, id, Utc::now());
    let removed = store.classes.remove(pos);
    info!("Class {id} deleted by {}", actor.id);
    Ok(removed)
}

/// Enroll a student. Returns false if already enrolled.
pub fn enroll(store: &mut AppStore, actor: &User, class_id: &str, student_id: &str) -> Result<bool> {
    let class = editable_class(store, actor, class_id)?;
    let added = class.student_ids.insert(student_id.to_string());
    if added {
        info!("Student {student_id} enrolled in {class_id}");
    }
    Ok(added)
}

/// Remove a student from a class. Returns false if not enrolled.
pub fn unenroll(store: &mut AppStore, actor: &User, class_id: &str, student_id: &str) -> Result<bool> {
    let class = editable_class(store, actor, class_id)?;
    let removed = class.student_ids.remove(student_id);
    if removed {
        info!("Student {student_id} removed from {class_id}");
    }
    Ok(removed)
}

fn editable_class<'a>(store: &'a mut AppStore, actor: &User, class_id: &str) -> Result<&'a mut ClassRecord> {
    let class = store
        .find_class_mut(class_id)
        .ok_or_else(|| AppError::not_found(format!("class {class_id}")))?;
    if !can_edit(actor, class) {
        return Err(AppError::denied(format!(
            "{} {} cannot change enrollment of {class_id}",
            actor.role, actor.id
        )));
    }
    Ok(class)
}

fn validate_form(form: &ClassForm) -> Result<()> {
    if form.name.trim().is_empty() {
        return Err(AppError::validation("class name cannot be empty"));
    }
    Ok(())
}
