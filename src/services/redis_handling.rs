use chrono::Utc;
use redis::{Commands, RedisError};

use crate::services::db_models::MenuEntry;
use crate::types::{ACTIVE_MENU_KEY, MENU_KEY, MENU_VERSION_KEY};

pub enum CachedMenu {
    Hit(Vec<MenuEntry>),
    /// Carries the catalog version observed before the miss; pass it back to
    /// [`put_menu_to_cache`] once the menu has been loaded from postgres.
    Miss { version: u64 },
}

fn menu_version(conn: &mut redis::Connection) -> Result<u64, RedisError> {
    Ok(conn.get::<_, Option<u64>>(MENU_VERSION_KEY)?.unwrap_or(0))
}

/// Stores a menu snapshot under a fresh key and points the active menu at it.
///
/// `Ok(None)` means the catalog changed after `version` was read and the
/// snapshot was discarded.
pub fn put_menu_to_cache(
    db: &redis::Client,
    menu: &[MenuEntry],
    version: u64,
    ttl_s: u64,
) -> Result<Option<String>, String> {
    let menu_json = match serde_json::to_string(menu) {
        Ok(menu) => menu,
        Err(_) => return Err("Failed to compose JSON object of menu".into()),
    };

    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into()),
    };

    let menu_key = format!("{MENU_KEY}_{version}_{}", Utc::now().timestamp_millis());

    // WATCH on the version key: an invalidation between the check and EXEC aborts the write.
    let stored: bool = redis::transaction(&mut conn, &[MENU_VERSION_KEY], |conn, pipe| {
        if menu_version(conn)? != version {
            return Ok(Some(false));
        }

        pipe.cmd("SET").arg(&menu_key).arg(&menu_json).arg("EX").arg(ttl_s).ignore()
            .cmd("SET").arg(ACTIVE_MENU_KEY).arg(&menu_key).arg("EX").arg(ttl_s).ignore()
            .query::<Option<()>>(conn)
            .map(|done| done.map(|()| true))
    })
    .map_err(|err: RedisError| format!("Failed to store menu: {err}"))?;

    Ok(stored.then_some(menu_key))
}

pub fn get_menu(db: &redis::Client) -> Result<CachedMenu, String> {
    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into()),
    };

    let version = menu_version(&mut conn).map_err(|err| format!("Failed to read menu version: {err}"))?;

    let active_menu_key = match redis::cmd("GET").arg(ACTIVE_MENU_KEY).query::<Option<String>>(&mut conn) {
        Ok(Some(key)) => key,
        Ok(None) => return Ok(CachedMenu::Miss { version }),
        Err(_) => return Err("Failed to get value of active menu".into()),
    };

    match redis::cmd("GET").arg(active_menu_key).query::<Option<String>>(&mut conn) {
        Ok(Some(menu_json)) => serde_json::from_str(&menu_json)
            .map(CachedMenu::Hit)
            .map_err(|err| format!("Cached menu is not valid JSON: {err}")),
        Ok(None) => Ok(CachedMenu::Miss { version }),
        Err(_) => Err("Failed to get JSON object of menu from redis db".into()),
    }
}

/// Called after every catalog write so the next read rebuilds the menu.
/// Bumping the version also voids any snapshot loaded before the write.
pub fn invalidate_menu(db: &redis::Client) -> Result<(), String> {
    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into()),
    };

    redis::pipe()
        .atomic()
        .cmd("INCR").arg(MENU_VERSION_KEY).ignore()
        .cmd("DEL").arg(ACTIVE_MENU_KEY).ignore()
        .query::<()>(&mut conn)
        .map_err(|err| format!("Failed to drop active menu: {err}"))
}
