use super::{read_enum, read_timestamp, LedgerStore};
use crate::{
    error::LedgerResult,
    group_registry::{Group, GroupStatus, Membership},
    types::timestamp_to_sql,
};
use rusqlite::{params, OptionalExtension, Row};

const GROUP_COLUMNS: &str = "g.group_id, g.name, g.amount_per_person, g.frequency,
     g.total_members, g.created_by, g.status, g.created_at";

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        group_id:          row.get(0)?,
        name:              row.get(1)?,
        amount_per_person: row.get(2)?,
        frequency:         read_enum(row, 3)?,
        total_members:     row.get::<_, i64>(4)? as u32,
        created_by:        row.get(5)?,
        status:            read_enum(row, 6)?,
        created_at:        read_timestamp(row, 7)?,
    })
}

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        group_id:      row.get(0)?,
        account_id:    row.get(1)?,
        position:      row.get::<_, i64>(2)? as u32,
        has_collected: row.get::<_, i32>(3)? != 0,
        joined_at:     read_timestamp(row, 4)?,
    })
}

impl LedgerStore {
    // ── Group ─────────────────────────────────────────────────────

    pub fn insert_group(&self, group: &Group) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO esusu_group (
                group_id, name, amount_per_person, frequency, total_members,
                created_by, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                group.group_id,
                group.name,
                group.amount_per_person,
                group.frequency.as_str(),
                group.total_members as i64,
                group.created_by,
                group.status.as_str(),
                timestamp_to_sql(&group.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_group(&self, group_id: &str) -> LedgerResult<Option<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM esusu_group g WHERE g.group_id = ?1");
        let group = self
            .conn
            .query_row(&sql, params![group_id], group_from_row)
            .optional()?;
        Ok(group)
    }

    pub fn group_by_name(&self, name: &str) -> LedgerResult<Option<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM esusu_group g WHERE g.name = ?1");
        let group = self
            .conn
            .query_row(&sql, params![name], group_from_row)
            .optional()?;
        Ok(group)
    }

    /// Case-sensitive: SQLite's default BINARY collation.
    pub fn group_name_exists(&self, name: &str) -> LedgerResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM esusu_group WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn set_group_status(&self, group_id: &str, status: GroupStatus) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE esusu_group SET status = ?1 WHERE group_id = ?2",
            params![status.as_str(), group_id],
        )?;
        Ok(())
    }

    pub fn groups_for_account(&self, account_id: &str) -> LedgerResult<Vec<Group>> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM esusu_group g
             JOIN membership m ON m.group_id = g.group_id
             WHERE m.account_id = ?1
             ORDER BY g.created_at ASC, g.name ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_id], group_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Membership ────────────────────────────────────────────────

    pub fn insert_membership(&self, m: &Membership) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO membership (group_id, account_id, position, has_collected, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                m.group_id,
                m.account_id,
                m.position as i64,
                if m.has_collected { 1 } else { 0 },
                timestamp_to_sql(&m.joined_at),
            ],
        )?;
        Ok(())
    }

    pub fn membership(&self, group_id: &str, account_id: &str) -> LedgerResult<Option<Membership>> {
        let m = self
            .conn
            .query_row(
                "SELECT group_id, account_id, position, has_collected, joined_at
                 FROM membership WHERE group_id = ?1 AND account_id = ?2",
                params![group_id, account_id],
                membership_from_row,
            )
            .optional()?;
        Ok(m)
    }

    pub fn members(&self, group_id: &str) -> LedgerResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id, account_id, position, has_collected, joined_at
             FROM membership WHERE group_id = ?1
             ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![group_id], membership_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn member_count(&self, group_id: &str) -> LedgerResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM membership WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    pub fn collected_count(&self, group_id: &str) -> LedgerResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM membership WHERE group_id = ?1 AND has_collected = 1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Lowest-position member that has not collected yet.
    pub fn next_uncollected(&self, group_id: &str) -> LedgerResult<Option<Membership>> {
        let m = self
            .conn
            .query_row(
                "SELECT group_id, account_id, position, has_collected, joined_at
                 FROM membership WHERE group_id = ?1 AND has_collected = 0
                 ORDER BY position ASC LIMIT 1",
                params![group_id],
                membership_from_row,
            )
            .optional()?;
        Ok(m)
    }

    pub fn set_has_collected(&self, group_id: &str, account_id: &str) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE membership SET has_collected = 1 WHERE group_id = ?1 AND account_id = ?2",
            params![group_id, account_id],
        )?;
        Ok(())
    }
}
