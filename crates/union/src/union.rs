use crate::{
    error::{Error, Result},
    mount::{MountAction, MountFlag},
};
use ninefold_proto::{Dir, Errno, Qid};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Anything that can sit in a union: it only needs a qid.
pub trait Entry {
    fn qid(&self) -> Qid;

    fn is_dir(&self) -> bool {
        self.qid().is_dir()
    }
}

impl Entry for Qid {
    fn qid(&self) -> Qid {
        *self
    }
}

impl Entry for Dir {
    fn qid(&self) -> Qid {
        self.qid
    }
}

impl<T: Entry + ?Sized> Entry for &T {
    fn qid(&self) -> Qid {
        (**self).qid()
    }
}

/// One directory of a union and the modifiers it was bound with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member<T> {
    pub entry: T,
    pub create: bool,
    pub cache: bool,
}

impl<T> Member<T> {
    fn plain(entry: T) -> Self {
        Self {
            entry,
            create: false,
            cache: false,
        }
    }
}

/// The ordered set of directories presented at a single mount point.
///
/// Members are kept in search order: a name resolves to the first member that
/// holds it. The owner of the mount table is expected to serialize mutation
/// of a given union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union<T> {
    members: Vec<Member<T>>,
}

impl<T: Entry> Union<T> {
    /// The mount point before anything is bound onto it. `old` carries no
    /// modifiers, so it is never a create target.
    #[must_use]
    pub fn new(old: T) -> Self {
        Self {
            members: vec![Member::plain(old)],
        }
    }

    #[must_use]
    pub fn members(&self) -> &[Member<T>] {
        &self.members
    }

    /// Entries in search order.
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.members.iter().map(|member| &member.entry)
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<T> {
        self.members.into_iter().map(|member| member.entry).collect()
    }

    /// Whether reads of files reached through `member` may come from a cache.
    ///
    /// `member` is the qid of the union member the walk went through, not the
    /// qid of the file itself: the union only knows its members' roots.
    #[must_use]
    pub fn cached(&self, member: &Qid) -> bool {
        self.members
            .iter()
            .any(|m| m.cache && m.entry.qid().same_file(member))
    }

    /// # Errors
    /// - `Error::NotDirectory` when `flag` is BEFORE or AFTER and either side
    ///   is not a directory
    pub fn mount(&mut self, new: T, flag: MountFlag) -> Result<()> {
        self.insert(vec![new], flag)
    }

    /// Like [`Union::mount`], for a local tree. The cache flag is refused.
    ///
    /// # Errors
    /// - `Error::CacheOnBind` if `flag.cache` is set
    /// - see [`Union::mount`]
    pub fn bind(&mut self, new: T, flag: MountFlag) -> Result<()> {
        if flag.cache {
            return Err(Error::CacheOnBind);
        }
        self.insert(vec![new], flag)
    }

    /// Mount every constituent of `new`, keeping its order. Only the first
    /// constituent takes the modifiers of `flag`.
    ///
    /// # Errors
    /// - see [`Union::mount`]
    pub fn mount_union(&mut self, new: Union<T>, flag: MountFlag) -> Result<()> {
        self.insert(new.into_entries(), flag)
    }

    /// # Errors
    /// - see [`Union::bind`]
    pub fn bind_union(&mut self, new: Union<T>, flag: MountFlag) -> Result<()> {
        if flag.cache {
            return Err(Error::CacheOnBind);
        }
        self.insert(new.into_entries(), flag)
    }

    fn insert(&mut self, incoming: Vec<T>, flag: MountFlag) -> Result<()> {
        if flag.action != MountAction::Repl {
            let not_dir = self
                .entries()
                .chain(incoming.iter())
                .find(|entry| !entry.is_dir());
            if let Some(entry) = not_dir {
                return Err(Error::NotDirectory(entry.qid()));
            }
        }

        let mut incoming = incoming.into_iter().map(Member::plain);
        let mut added: Vec<Member<T>> = Vec::new();
        if let Some(mut first) = incoming.next() {
            first.create = flag.create;
            first.cache = flag.cache;
            added.push(first);
        }
        added.extend(incoming);

        if added.is_empty() {
            return Ok(());
        }

        match flag.action {
            MountAction::Repl => self.members = added,
            MountAction::Before => {
                added.append(&mut self.members);
                self.members = added;
            }
            MountAction::After => self.members.append(&mut added),
        }

        debug!(%flag, members = self.members.len(), "union updated");
        Ok(())
    }

    /// Resolve `name` to the first member `probe` finds it in.
    ///
    /// # Errors
    /// - `Error::InvalidName` if `name` is not a single path element
    /// - `Error::NotFound` if no member holds `name`
    pub fn lookup<R, F>(&self, name: &str, mut probe: F) -> Result<R>
    where
        F: FnMut(&T, &str) -> Option<R>,
    {
        check_name(name)?;
        self.entries()
            .find_map(|entry| probe(entry, name))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Merge the listings of all members. A name seen in an earlier member
    /// hides the same name further down.
    pub fn read_dir<F>(&self, mut list: F) -> Vec<Dir>
    where
        F: FnMut(&T) -> Vec<Dir>,
    {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for entry in self.entries() {
            for dir in list(entry) {
                if seen.insert(dir.name.clone()) {
                    merged.push(dir);
                }
            }
        }
        merged
    }

    /// The first member, in search order, bound with `create`.
    ///
    /// # Errors
    /// - `Error::NoCreateTarget` if no member was
    pub fn create_target(&self) -> Result<&Member<T>> {
        self.members
            .iter()
            .find(|member| member.create)
            .ok_or(Error::NoCreateTarget)
    }

    /// Create `name` in the union.
    ///
    /// `exists` reports whether a member already holds `name`; `create` makes
    /// the file in the chosen member. A failing `create` fails the whole
    /// operation: later members are not tried.
    ///
    /// # Errors
    /// - `Error::InvalidName` if `name` is not a single path element
    /// - `Error::Exists` if any member already holds `name`
    /// - `Error::NoCreateTarget` if no member accepts creates
    /// - `Error::CreateFailed` carrying the errno `create` returned
    pub fn create<R, E, C>(&self, name: &str, mut exists: E, create: C) -> Result<R>
    where
        E: FnMut(&T, &str) -> bool,
        C: FnOnce(&T, &str) -> std::result::Result<R, Errno>,
    {
        check_name(name)?;
        if self.entries().any(|entry| exists(entry, name)) {
            return Err(Error::Exists(name.to_string()));
        }

        let target = self.create_target()?;
        trace!(name, target = %target.entry.qid(), "creating in union member");
        create(&target.entry, name).map_err(|errno| Error::CreateFailed {
            name: name.to_string(),
            errno,
        })
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn dir(path: u64) -> Qid {
        Qid::directory(path, 0)
    }

    fn paths<T: Entry>(union: &Union<T>) -> Vec<u64> {
        union.entries().map(|entry| entry.qid().path).collect()
    }

    #[test]
    fn test_new_union_is_old() {
        let union = Union::new(dir(1));
        assert_eq!(paths(&union), vec![1]);
        assert!(!union.members()[0].create);
        assert_eq!(union.create_target(), Err(Error::NoCreateTarget));
    }

    #[test]
    fn test_repl_is_not_cumulative() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.mount(dir(10), MountFlag::REPL)?;
        union.mount(dir(11), MountFlag::REPL)?;
        assert_eq!(paths(&union), vec![11]);
        Ok(())
    }

    #[test]
    fn test_repl_allows_files() -> Result<()> {
        let mut union = Union::new(Qid::file(1, 0));
        union.bind(Qid::file(2, 0), MountFlag::REPL)?;
        assert_eq!(paths(&union), vec![2]);
        Ok(())
    }

    #[test]
    fn test_before_accumulates() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.mount(dir(10), MountFlag::BEFORE)?;
        union.mount(dir(11), MountFlag::BEFORE)?;
        assert_eq!(paths(&union), vec![11, 10, 1]);
        Ok(())
    }

    #[test]
    fn test_after_accumulates() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.mount(dir(10), MountFlag::AFTER)?;
        union.mount(dir(11), MountFlag::AFTER)?;
        assert_eq!(paths(&union), vec![1, 10, 11]);
        Ok(())
    }

    #[test]
    fn test_mixed_order() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(10), MountFlag::AFTER)?;
        union.bind(dir(11), MountFlag::BEFORE)?;
        union.bind(dir(12), MountFlag::AFTER)?;
        union.bind(dir(13), MountFlag::BEFORE)?;
        assert_eq!(paths(&union), vec![13, 11, 1, 10, 12]);

        union.bind(dir(14), MountFlag::REPL)?;
        assert_eq!(paths(&union), vec![14]);
        Ok(())
    }

    #[test]
    fn test_before_requires_directories() -> Result<()> {
        let mut union = Union::new(dir(1));
        let file = Qid::file(2, 0);
        assert_eq!(
            union.mount(file, MountFlag::BEFORE),
            Err(Error::NotDirectory(file))
        );
        assert_eq!(paths(&union), vec![1]);

        let mut union = Union::new(Qid::file(3, 0));
        let err = union.bind(dir(4), MountFlag::AFTER).unwrap_err();
        assert_eq!(err.errno(), Errno::NotDir);
        assert_eq!(err.to_string(), "(0000000000000003 0 00): not a directory");
        assert_eq!(paths(&union), vec![3]);
        Ok(())
    }

    #[test]
    fn test_bind_refuses_cache() {
        let mut union = Union::new(dir(1));
        let err = union
            .bind(dir(2), MountFlag::BEFORE.with_cache())
            .unwrap_err();
        assert_eq!(err, Error::CacheOnBind);
        assert_eq!(err.errno(), Errno::Inval);
        assert_eq!(paths(&union), vec![1]);
    }

    #[test]
    fn test_mount_cache() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.mount(dir(2), MountFlag::AFTER.with_cache())?;
        assert!(union.cached(&dir(2)));
        assert!(!union.cached(&dir(1)));

        // a file under the cached member is looked up by the member it was
        // reached through
        let file = Qid::file(20, 0);
        let through = union.lookup("data", |entry, _| {
            (entry.path == 2).then_some(*entry)
        })?;
        assert!(!union.cached(&file));
        assert!(union.cached(&through));
        Ok(())
    }

    #[test]
    fn test_mount_union_keeps_order() -> Result<()> {
        let mut other = Union::new(dir(20));
        other.bind(dir(21), MountFlag::AFTER)?;
        other.bind(dir(22), MountFlag::AFTER)?;

        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::AFTER)?;
        union.bind_union(other, MountFlag::BEFORE.with_create())?;
        assert_eq!(paths(&union), vec![20, 21, 22, 1, 2]);

        let creates: Vec<bool> = union.members().iter().map(|m| m.create).collect();
        assert_eq!(creates, vec![true, false, false, false, false]);
        Ok(())
    }

    #[test]
    fn test_mount_union_repl() -> Result<()> {
        let mut other = Union::new(dir(20));
        other.bind(dir(21), MountFlag::AFTER)?;

        let mut union = Union::new(dir(1));
        union.mount_union(other, MountFlag::REPL)?;
        assert_eq!(paths(&union), vec![20, 21]);
        Ok(())
    }

    #[test]
    fn test_lookup_first_member_wins() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::BEFORE)?;
        union.bind(dir(3), MountFlag::AFTER)?;

        let contents: HashMap<u64, Vec<&str>> = HashMap::from([
            (1, vec!["shared", "only-old"]),
            (2, vec!["shared"]),
            (3, vec!["shared", "only-after"]),
        ]);
        let probe = |entry: &Qid, name: &str| {
            contents[&entry.path]
                .contains(&name)
                .then_some(entry.path)
        };

        assert_eq!(union.lookup("shared", probe)?, 2);
        assert_eq!(union.lookup("only-old", probe)?, 1);
        assert_eq!(union.lookup("only-after", probe)?, 3);

        let err = union.lookup("missing", probe).unwrap_err();
        assert_eq!(err, Error::NotFound("missing".to_string()));
        assert_eq!(err.errno(), Errno::NoEnt);
        Ok(())
    }

    #[test]
    fn test_lookup_rejects_paths() {
        let union = Union::new(dir(1));
        for name in ["", ".", "..", "a/b"] {
            let err = union.lookup(name, |_, _| Some(())).unwrap_err();
            assert_eq!(err.errno(), Errno::Inval);
        }
    }

    #[test]
    fn test_read_dir_merges() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::BEFORE)?;

        let listing = |entry: &Qid| match entry.path {
            1 => vec![
                Dir::new("a", Qid::file(100, 0), 0o644),
                Dir::new("b", Qid::file(101, 0), 0o644),
            ],
            _ => vec![
                Dir::new("b", Qid::file(200, 0), 0o644),
                Dir::new("c", Qid::file(201, 0), 0o644),
            ],
        };

        let merged: Vec<(String, u64)> = union
            .read_dir(listing)
            .into_iter()
            .map(|d| (d.name, d.qid.path))
            .collect();
        assert_eq!(
            merged,
            vec![
                ("b".to_string(), 200),
                ("c".to_string(), 201),
                ("a".to_string(), 100),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_create_target_is_first_create_member() -> Result<()> {
        // [X, Y(CREATE), Z(CREATE)]
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::AFTER.with_create())?;
        union.bind(dir(3), MountFlag::AFTER.with_create())?;

        assert_eq!(union.create_target()?.entry.path, 2);

        let created = union.create(
            "new",
            |_, _| false,
            |entry, name| Ok((entry.path, name.to_string())),
        )?;
        assert_eq!(created, (2, "new".to_string()));
        Ok(())
    }

    #[test]
    fn test_create_failure_does_not_fall_back() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::AFTER.with_create())?;
        union.bind(dir(3), MountFlag::AFTER.with_create())?;

        let attempted = RefCell::new(Vec::new());
        let result: Result<()> = union.create(
            "new",
            |_, _| false,
            |entry, _| {
                attempted.borrow_mut().push(entry.path);
                Err(Errno::Access)
            },
        );

        let err = result.unwrap_err();
        assert_eq!(
            err,
            Error::CreateFailed {
                name: "new".to_string(),
                errno: Errno::Access,
            }
        );
        assert_eq!(err.errno(), Errno::Access);
        assert_eq!(attempted.into_inner(), vec![2]);
        Ok(())
    }

    #[test]
    fn test_create_without_target() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::BEFORE)?;

        let err = union
            .create("new", |_, _| false, |_, _| Ok(()))
            .unwrap_err();
        assert_eq!(err, Error::NoCreateTarget);
        assert_eq!(err.errno(), Errno::Perm);
        Ok(())
    }

    #[test]
    fn test_create_existing_name() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::AFTER.with_create())?;

        // present in a member that is not the create target
        let err = union
            .create("here", |entry, _| entry.path == 1, |_, _| Ok(()))
            .unwrap_err();
        assert_eq!(err.errno(), Errno::Exist);
        Ok(())
    }

    #[test]
    fn test_repl_with_create() -> Result<()> {
        let mut union = Union::new(dir(1));
        union.bind(dir(2), MountFlag::BEFORE.with_create())?;
        union.bind(dir(3), MountFlag::REPL)?;
        assert_eq!(union.create_target(), Err(Error::NoCreateTarget));

        union.bind(dir(4), MountFlag::REPL.with_create())?;
        assert_eq!(union.create_target()?.entry.path, 4);
        Ok(())
    }

    #[test]
    fn test_union_of_dirs() -> Result<()> {
        let bin = Dir::new("bin", Qid::directory(1, 0), 0o755);
        let local = Dir::new("bin", Qid::directory(2, 0), 0o755);

        let mut union = Union::new(&bin);
        union.bind(&local, MountFlag::BEFORE.with_create())?;
        assert_eq!(union.create_target()?.entry.qid, local.qid);
        Ok(())
    }
}
