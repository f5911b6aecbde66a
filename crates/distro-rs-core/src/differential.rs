//! Computes what has to change to bring an installed server in line with a descriptor.
//!
//! The differential is pure bookkeeping: nothing here touches the filesystem. Applying it
//! (copying, deleting files) is up to the caller.

use crate::artifact::{Artifact, ArtifactIdentity, ShortNameIdentity};

/// Which way the platform artifact moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Upgrade,
	Downgrade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformChange {
	/// The platform artifact to install.
	pub artifact: Artifact,
	pub direction: Direction,
}

/// An installed module and the artifact replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactChange {
	pub old: Artifact,
	pub new: Artifact,
}

/// The structured set of changes between an installed and a target artifact list.
///
/// An installed artifact appears in at most one of `updates`, `downgrades` and `deletions`.
/// The platform artifact is only ever reported through `platform`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeDifferential {
	platform: Option<PlatformChange>,
	updates: Vec<ArtifactChange>,
	downgrades: Vec<ArtifactChange>,
	additions: Vec<Artifact>,
	deletions: Vec<Artifact>,
}

impl UpgradeDifferential {
	pub fn platform(&self) -> Option<&PlatformChange> {
		self.platform.as_ref()
	}

	/// `true` only when the platform moved up.
	pub fn is_platform_upgraded(&self) -> bool {
		matches!(self.platform, Some(PlatformChange { direction: Direction::Upgrade, .. }))
	}

	/// Modules replaced by a higher version, in target order.
	pub fn updates(&self) -> &[ArtifactChange] {
		&self.updates
	}

	/// Modules replaced by a lower version, in target order.
	pub fn downgrades(&self) -> &[ArtifactChange] {
		&self.downgrades
	}

	/// Modules not installed yet, in target order.
	pub fn additions(&self) -> &[Artifact] {
		&self.additions
	}

	/// Installed modules the target no longer lists, in installed order.
	pub fn deletions(&self) -> &[Artifact] {
		&self.deletions
	}

	pub fn is_empty(&self) -> bool {
		self.platform.is_none()
			&& self.updates.is_empty()
			&& self.downgrades.is_empty()
			&& self.additions.is_empty()
			&& self.deletions.is_empty()
	}
}

impl std::fmt::Display for UpgradeDifferential {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_empty() {
			return writeln!(f, "No changes.")
		}
		if let Some(change) = &self.platform {
			let verb = match change.direction {
				Direction::Upgrade => "upgrade",
				Direction::Downgrade => "downgrade",
			};
			writeln!(f, "Platform {} to {}", verb, change.artifact.version)?;
		}
		for change in &self.updates {
			writeln!(f, "Update {} {} -> {}", change.old.artifact_id, change.old.version, change.new.version)?;
		}
		for change in &self.downgrades {
			writeln!(f, "Downgrade {} {} -> {}", change.old.artifact_id, change.old.version, change.new.version)?;
		}
		for artifact in &self.additions {
			writeln!(f, "Add {} {}", artifact.artifact_id, artifact.version)?;
		}
		for artifact in &self.deletions {
			writeln!(f, "Delete {} {}", artifact.artifact_id, artifact.version)?;
		}
		Ok(())
	}
}

/// Computes differentials.
///
/// Artifacts are matched by an [`ArtifactIdentity`], [`ShortNameIdentity`] unless replaced.
pub struct Differ<I = ShortNameIdentity> {
	identity: I,
	refresh_snapshots: bool,
}

impl Default for Differ<ShortNameIdentity> {
	fn default() -> Self {
		Self::new()
	}
}

impl Differ<ShortNameIdentity> {
	pub fn new() -> Self {
		Self {
			identity: ShortNameIdentity,
			refresh_snapshots: false,
		}
	}
}

impl<I: ArtifactIdentity> Differ<I> {
	pub fn with_identity(identity: I) -> Self {
		Self {
			identity,
			refresh_snapshots: false,
		}
	}

	/// When set, an installed snapshot matched by an equal target snapshot is recorded as an update
	/// so the latest build gets fetched again. Off by default.
	pub fn refresh_snapshots(mut self, refresh: bool) -> Self {
		self.refresh_snapshots = refresh;
		self
	}

	/// Compares `installed` against `target`.
	///
	/// Each installed artifact is matched with at most one target. Artifacts with the same
	/// artifact id are paired first, the remaining targets then take the remaining installed
	/// artifacts of the same identity. The platform is only ever paired with a platform.
	/// When several installed artifacts qualify, the lowest by coordinates is taken, so the
	/// result does not depend on the order of `installed`.
	///
	/// # Errors
	/// - [`CoreArtifactDeletionAttempted`](crate::Error::CoreArtifactDeletionAttempted) when an installed
	/// platform artifact has no counterpart in `target`. Nothing is returned in that case.
	pub fn diff(&self, installed: &[Artifact], target: &[Artifact]) -> crate::Result<UpgradeDifferential> {
		let pairs = self.pair(installed, target);
		let mut differential = UpgradeDifferential::default();

		for (new, old) in target.iter().zip(&pairs) {
			let Some(old) = old.map(|i| &installed[i]) else {
				log::trace!("{} is not installed, adding", new);
				differential.additions.push(new.clone());
				continue;
			};

			let direction = if new.version > old.version {
				Direction::Upgrade
			} else if new.version < old.version {
				Direction::Downgrade
			} else if self.refresh_snapshots && new.version.is_unstable() && old.version.is_unstable() {
				Direction::Upgrade
			} else {
				log::trace!("{} is already at {}", old.artifact_id, old.version);
				continue;
			};

			log::trace!("{:?} {} from {} to {}", direction, old.artifact_id, old.version, new.version);
			if new.is_platform() {
				differential.platform = Some(PlatformChange { artifact: new.clone(), direction });
				continue;
			}
			let change = ArtifactChange { old: old.clone(), new: new.clone() };
			match direction {
				Direction::Upgrade => differential.updates.push(change),
				Direction::Downgrade => differential.downgrades.push(change),
			}
		}

		for (i, old) in installed.iter().enumerate() {
			if pairs.contains(&Some(i)) {
				continue;
			}
			if old.is_platform() {
				return Err(crate::Error::CoreArtifactDeletionAttempted(old.clone()))
			}
			log::trace!("{} is no longer wanted, deleting", old);
			differential.deletions.push(old.clone());
		}

		log::debug!(
			"Differential: platform {:?}, {} updates, {} downgrades, {} additions, {} deletions",
			differential.platform.as_ref().map(|p| p.direction),
			differential.updates.len(),
			differential.downgrades.len(),
			differential.additions.len(),
			differential.deletions.len(),
		);
		Ok(differential)
	}

	/// For every target, the index of the installed artifact it replaces.
	fn pair(&self, installed: &[Artifact], target: &[Artifact]) -> Vec<Option<usize>> {
		let mut taken = vec![false; installed.len()];
		let mut pairs = vec![None; target.len()];

		for exact_id in [true, false] {
			for (t, new) in target.iter().enumerate() {
				if pairs[t].is_some() {
					continue;
				}
				let found = installed.iter()
					.enumerate()
					.filter(|(i, old)| !taken[*i] && self.matches(old, new) && (!exact_id || old.artifact_id == new.artifact_id))
					.min_by(|(_, l), (_, r)| coordinates(l).cmp(&coordinates(r)))
					.map(|(i, _)| i);
				if let Some(i) = found {
					taken[i] = true;
					pairs[t] = Some(i);
				}
			}
		}
		pairs
	}

	fn matches(&self, old: &Artifact, new: &Artifact) -> bool {
		old.is_platform() == new.is_platform() && self.identity.same_artifact(old, new)
	}
}

fn coordinates(a: &Artifact) -> (&str, &str, &crate::version::Version) {
	(&a.artifact_id, &a.group_id, &a.version)
}

/// [`Differ::diff`] with the default identity and no snapshot refresh.
pub fn calculate_update_differential(installed: &[Artifact], target: &[Artifact]) -> crate::Result<UpgradeDifferential> {
	Differ::new().diff(installed, target)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::artifact::GROUP_MODULE;

	fn platform(v: &str) -> Artifact { Artifact::platform(v) }
	fn module(id: &str, v: &str) -> Artifact { Artifact::module(id, v) }

	#[test]
	fn removing_platform_fails() {
		let installed = [platform("1.0"), module("a", "1.0")];
		let target = [module("a", "1.0")];
		assert!(matches!(calculate_update_differential(&installed, &target), Err(crate::Error::CoreArtifactDeletionAttempted(a)) if a.is_platform()));
	}

	#[test]
	fn platform_upgrade_is_tracked_separately() {
		let installed = [platform("1.0"), module("a", "1.0")];
		let target = [platform("2.0"), module("a", "1.0")];
		let diff = calculate_update_differential(&installed, &target).unwrap();
		assert!(diff.is_platform_upgraded());
		assert_eq!(diff.platform().unwrap().artifact, platform("2.0"));
		assert!(diff.updates().is_empty());
		assert!(diff.downgrades().is_empty());
		assert!(diff.additions().is_empty());
		assert!(diff.deletions().is_empty());
	}

	#[test]
	fn platform_downgrade() {
		let diff = calculate_update_differential(&[platform("2.0")], &[platform("1.9")]).unwrap();
		assert_eq!(diff.platform().unwrap().direction, Direction::Downgrade);
		assert!(!diff.is_platform_upgraded());
	}

	#[test]
	fn module_swap_adds_and_deletes() {
		let installed = [platform("1.0"), module("a", "1.0")];
		let target = [platform("1.0"), module("b", "1.0")];
		let diff = calculate_update_differential(&installed, &target).unwrap();
		assert_eq!(diff.additions(), [module("b", "1.0")]);
		assert_eq!(diff.deletions(), [module("a", "1.0")]);
		assert!(diff.platform().is_none());
	}

	#[test]
	fn module_update_and_downgrade() {
		let installed = [platform("1.0"), module("a", "1.0"), module("b", "2.0")];
		let target = [platform("1.0"), module("a", "1.1"), module("b", "1.5")];
		let diff = calculate_update_differential(&installed, &target).unwrap();
		assert_eq!(diff.updates(), [ArtifactChange { old: module("a", "1.0"), new: module("a", "1.1") }]);
		assert_eq!(diff.downgrades(), [ArtifactChange { old: module("b", "2.0"), new: module("b", "1.5") }]);
	}

	#[test]
	fn same_list_is_empty() {
		let list = [platform("2.0.0-SNAPSHOT"), module("a", "1.0"), module("b", "1.2-SNAPSHOT")];
		assert!(calculate_update_differential(&list, &list).unwrap().is_empty());
	}

	#[test]
	fn equal_snapshots_are_left_alone() {
		let diff = calculate_update_differential(&[module("a", "1.2.0-SNAPSHOT")], &[module("a", "1.2.0-snapshot")]).unwrap();
		assert!(diff.is_empty());
	}

	#[test]
	fn release_replaces_its_snapshot_as_update() {
		let diff = calculate_update_differential(&[module("a", "1.2.0-SNAPSHOT")], &[module("a", "1.2.0")]).unwrap();
		assert_eq!(diff.updates().len(), 1);
		assert!(diff.downgrades().is_empty());
	}

	#[test]
	fn snapshot_replacing_its_release_is_downgrade() {
		let diff = calculate_update_differential(&[module("a", "1.2.0")], &[module("a", "1.2.0-SNAPSHOT")]).unwrap();
		assert_eq!(diff.downgrades().len(), 1);
		assert!(diff.updates().is_empty());
	}

	#[test]
	fn refresh_snapshots_updates_equal_snapshots() {
		let installed = [platform("2.0-SNAPSHOT"), module("a", "1.2.0-SNAPSHOT"), module("b", "1.0")];
		let diff = Differ::new().refresh_snapshots(true).diff(&installed, &installed).unwrap();
		assert!(diff.is_platform_upgraded());
		assert_eq!(diff.updates().len(), 1);
		assert_eq!(diff.updates()[0].new, module("a", "1.2.0-SNAPSHOT"));
	}

	#[test]
	fn renamed_build_matches_by_short_name() {
		let installed = [Artifact::new("appui-omod", "1.0", GROUP_MODULE)];
		let target = [Artifact::new("appui-api", "1.1", GROUP_MODULE)];
		let diff = calculate_update_differential(&installed, &target).unwrap();
		assert_eq!(diff.updates().len(), 1);
	}

	#[test]
	fn custom_identity_is_used() {
		struct FullId;
		impl ArtifactIdentity for FullId {
			fn same_artifact(&self, l: &Artifact, r: &Artifact) -> bool { l.artifact_id == r.artifact_id }
		}
		let installed = [Artifact::new("appui-omod", "1.0", GROUP_MODULE)];
		let target = [Artifact::new("appui-api", "1.1", GROUP_MODULE)];
		let diff = Differ::with_identity(FullId).diff(&installed, &target).unwrap();
		assert_eq!(diff.additions().len(), 1);
		assert_eq!(diff.deletions().len(), 1);
	}

	#[test]
	fn deletions_follow_installed_order() {
		let installed = [platform("1.0"), module("c", "1"), module("a", "1"), module("b", "1")];
		let diff = calculate_update_differential(&installed, &[platform("1.0")]).unwrap();
		let ids: Vec<_> = diff.deletions().iter().map(|a| a.short_name()).collect();
		assert_eq!(ids, ["c", "a", "b"]);
	}

	#[test]
	fn installed_artifact_is_matched_once() {
		let installed = [platform("1.0"), module("appui", "1.0")];
		let target = [platform("1.0"), module("appui-extras", "0.5"), module("appui", "2.0")];
		let diff = calculate_update_differential(&installed, &target).unwrap();
		assert_eq!(diff.updates(), [ArtifactChange { old: module("appui", "1.0"), new: module("appui", "2.0") }]);
		assert!(diff.downgrades().is_empty());
		assert_eq!(diff.additions(), [module("appui-extras", "0.5")]);
		assert!(diff.deletions().is_empty());
	}

	#[test]
	fn module_never_pairs_with_platform() {
		let diff = calculate_update_differential(&[platform("1.0")], &[platform("1.0"), module("openmrs-atlas", "2.0")]).unwrap();
		assert!(diff.updates().is_empty());
		assert!(diff.platform().is_none());
		assert_eq!(diff.additions(), [module("openmrs-atlas", "2.0")]);

		let result = calculate_update_differential(&[platform("1.0")], &[module("openmrs-atlas", "2.0")]);
		assert!(matches!(result, Err(crate::Error::CoreArtifactDeletionAttempted(a)) if a.is_platform()));
	}

	#[test]
	fn installed_order_does_not_change_result() {
		let a = [platform("1.0"), module("appui-extras", "3.0"), module("appui", "1.0")];
		let b = [module("appui", "1.0"), platform("1.0"), module("appui-extras", "3.0")];
		let target = [platform("1.0"), module("appui", "2.0")];
		let left = calculate_update_differential(&a, &target).unwrap();
		let right = calculate_update_differential(&b, &target).unwrap();
		assert_eq!(left, right);
		assert_eq!(left.updates().len(), 1);
		assert_eq!(left.deletions(), [module("appui-extras", "3.0")]);
	}

	#[test]
	fn colliding_identities_without_exact_id_pick_lowest_coordinates() {
		let a = [Artifact::new("appui-b", "1.0", GROUP_MODULE), Artifact::new("appui-a", "1.0", GROUP_MODULE)];
		let b = [a[1].clone(), a[0].clone()];
		let target = [Artifact::new("appui-api", "2.0", GROUP_MODULE)];
		let left = calculate_update_differential(&a, &target).unwrap();
		assert_eq!(left, calculate_update_differential(&b, &target).unwrap());
		assert_eq!(left.updates()[0].old.artifact_id, "appui-a");
		assert_eq!(left.deletions()[0].artifact_id, "appui-b");
	}
}
