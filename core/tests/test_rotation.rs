mod common;

// Rotation must either fully succeed or leave the old key usable.
//
// Catches:
// * degenerate capability output accepted as a new key
// * retries on errors that should surface
// * local cache updated before the directory accepted the rotation

#[cfg(test)]
mod tests {
    use crate::common::{new_account, signing_keys, MockDirectory, MockRecrypt, PASSWORD};
    use docseal_core::{
        keys::{
            AccountContext, AsymmetricReencryption, CapabilityError, DirectoryError, EncryptedAccessKey,
            GroupKeyState, Plaintext, PrincipalId, PrivateKey, RotatedKeyMaterial, RotationProtocol,
        },
        types::SdkError,
    };

    fn private_key_of(account: &AccountContext) -> PrivateKey {
        account.unlock(PASSWORD).unwrap().private_key
    }

    // ## User rotation

    #[test]
    fn user_rotation_keeps_password_and_salt() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");
        let old_key = private_key_of(&alice);
        let old_salt = alice.wrapped_master_key().salt;

        let outcome = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, PASSWORD)
            .unwrap();

        assert_eq!(outcome.entity, PrincipalId::user("alice"));
        assert_eq!(outcome.previous_key_version, 0);
        assert_eq!(outcome.new_key_version, 1);
        assert!(!outcome.retried);
        assert_eq!(alice.key_version(), 1);
        assert_eq!(alice.wrapped_master_key().salt, old_salt);

        let new_key = private_key_of(&alice);
        assert_ne!(new_key, old_key);

        let commits = directory.rotations.borrow();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].key_version, 0);
        assert!(matches!(&commits[0].material, RotatedKeyMaterial::User(w) if w == alice.wrapped_master_key()));
    }

    #[test]
    fn degenerate_result_retried_once() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");

        recrypt.push_degenerate_rotation();
        recrypt.push_rotation(vec![5u8; 32], vec![6u8; 32]);

        let outcome = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, PASSWORD)
            .unwrap();

        assert!(outcome.retried);
        assert_eq!(recrypt.rotate_calls.get(), 2);
        assert_eq!(private_key_of(&alice).as_bytes(), &[5u8; 32]);
        assert_eq!(directory.rotations.borrow()[0].augmentation_factor.0, vec![6u8; 32]);
    }

    #[test]
    fn zero_augmentation_factor_alone_is_degenerate() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");

        recrypt.push_rotation(vec![1u8; 32], vec![0u8; 32]);
        recrypt.push_rotation(vec![2u8; 32], vec![3u8; 32]);

        let outcome = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, PASSWORD)
            .unwrap();
        assert!(outcome.retried);
        assert_eq!(private_key_of(&alice).as_bytes(), &[2u8; 32]);
    }

    #[test]
    fn two_degenerate_results_fail_and_keep_old_key() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");
        let before = alice.wrapped_master_key().clone();
        let old_key = private_key_of(&alice);

        recrypt.push_degenerate_rotation();
        recrypt.push_degenerate_rotation();

        let err = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, PASSWORD)
            .unwrap_err();

        assert!(matches!(err, SdkError::RotationFailure(_)));
        assert_eq!(recrypt.rotate_calls.get(), 2);
        assert_eq!(alice.wrapped_master_key(), &before);
        assert_eq!(alice.key_version(), 0);
        assert_eq!(private_key_of(&alice), old_key);
        assert!(directory.rotations.borrow().is_empty());
    }

    #[test]
    fn capability_error_is_not_retried() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");
        recrypt.fail_rotation.set(true);

        let err = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, PASSWORD)
            .unwrap_err();

        assert!(matches!(err, SdkError::Capability(CapabilityError::Failure(_))));
        assert_eq!(recrypt.rotate_calls.get(), 1);
    }

    #[test]
    fn wrong_password_stops_before_capability() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");

        let err = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, b"not the password")
            .unwrap_err();

        assert!(matches!(err, SdkError::IncorrectPassword));
        assert_eq!(recrypt.rotate_calls.get(), 0);
    }

    #[test]
    fn rejected_commit_leaves_cache_untouched_and_retry_works() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");
        let before = alice.wrapped_master_key().clone();
        let old_key = private_key_of(&alice);
        let protocol = RotationProtocol::new(&recrypt, &directory);

        directory.reject_commits.set(true);
        let err = protocol.rotate_user_key(&mut alice, PASSWORD).unwrap_err();
        assert!(matches!(err, SdkError::Directory(DirectoryError::Rejected(_))));
        assert_eq!(alice.wrapped_master_key(), &before);
        assert_eq!(private_key_of(&alice), old_key);

        directory.reject_commits.set(false);
        let outcome = protocol.rotate_user_key(&mut alice, PASSWORD).unwrap();
        assert_eq!(outcome.new_key_version, 1);
        assert_ne!(private_key_of(&alice), old_key);
    }

    #[test]
    fn stale_version_conflicts() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let mut alice = new_account(&recrypt, &directory, "alice");
        directory.versions.borrow_mut().insert(alice.principal(), 4);

        let err = RotationProtocol::new(&recrypt, &directory)
            .rotate_user_key(&mut alice, PASSWORD)
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Directory(DirectoryError::VersionConflict { expected: 0, actual: 4 })
        ));
        assert_eq!(alice.key_version(), 0);
    }

    // ## Group rotation

    struct GroupFixture {
        recrypt: MockRecrypt,
        directory: MockDirectory,
        alice: AccountContext,
        bob: AccountContext,
        group: GroupKeyState,
    }

    fn group_fixture() -> GroupFixture {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let alice = new_account(&recrypt, &directory, "alice");
        let bob = new_account(&recrypt, &directory, "bob");

        let group_pair = recrypt.generate_key_pair().unwrap();
        let encrypted_key = recrypt
            .encrypt(
                &Plaintext::new(group_pair.private_key.as_bytes().to_vec()),
                alice.public_key(),
                &signing_keys(),
            )
            .unwrap();
        let group = GroupKeyState::new(
            "engineering",
            0,
            vec!["alice".to_string(), "bob".to_string()],
            EncryptedAccessKey { principal: alice.principal(), encrypted_key },
        );

        GroupFixture { recrypt, directory, alice, bob, group }
    }

    #[test]
    fn group_rotation_reseals_to_every_admin() {
        let mut fx = group_fixture();
        fx.recrypt.push_rotation(vec![8u8; 32], vec![9u8; 32]);
        let alice_sk = private_key_of(&fx.alice);

        let outcome = RotationProtocol::new(&fx.recrypt, &fx.directory)
            .rotate_group_key(&fx.alice, &alice_sk, &mut fx.group)
            .unwrap();

        assert_eq!(outcome.entity, PrincipalId::group("engineering"));
        assert_eq!(outcome.resealed_keys, 2);
        assert_eq!(outcome.new_key_version, 1);
        assert_eq!(fx.group.key_version(), 1);

        // Alice's cached copy now opens to the new group key.
        let mine = fx
            .recrypt
            .decrypt(&fx.group.encrypted_private_key().encrypted_key, &alice_sk)
            .unwrap();
        assert_eq!(mine.as_bytes(), &[8u8; 32]);

        // Bob's copy went to the directory.
        let commits = fx.directory.rotations.borrow();
        let RotatedKeyMaterial::Group(admin_keys) = &commits[0].material else {
            panic!("expected group material");
        };
        let bobs = admin_keys
            .iter()
            .find(|k| k.principal == fx.bob.principal())
            .expect("bob's copy");
        let bob_sk = private_key_of(&fx.bob);
        assert_eq!(fx.recrypt.decrypt(&bobs.encrypted_key, &bob_sk).unwrap().as_bytes(), &[8u8; 32]);
    }

    #[test]
    fn non_admin_cannot_rotate_group() {
        let mut fx = group_fixture();
        let carol = new_account(&fx.recrypt, &fx.directory, "carol");
        let carol_sk = private_key_of(&carol);

        let err = RotationProtocol::new(&fx.recrypt, &fx.directory)
            .rotate_group_key(&carol, &carol_sk, &mut fx.group)
            .unwrap_err();
        assert!(matches!(err, SdkError::RotationFailure(_)));
        assert_eq!(fx.recrypt.rotate_calls.get(), 0);
    }

    #[test]
    fn admin_without_public_key_aborts_before_submit() {
        let mut fx = group_fixture();
        fx.directory.public_keys.borrow_mut().remove(&fx.bob.principal());
        let before = fx.group.clone();
        let alice_sk = private_key_of(&fx.alice);

        let err = RotationProtocol::new(&fx.recrypt, &fx.directory)
            .rotate_group_key(&fx.alice, &alice_sk, &mut fx.group)
            .unwrap_err();

        assert!(matches!(err, SdkError::Directory(DirectoryError::KeyNotFound(p)) if p.id == "bob"));
        assert_eq!(fx.group, before);
        assert!(fx.directory.rotations.borrow().is_empty());
    }

    #[test]
    fn group_rejected_commit_keeps_old_key() {
        let mut fx = group_fixture();
        fx.directory.reject_commits.set(true);
        let before = fx.group.clone();
        let alice_sk = private_key_of(&fx.alice);

        let err = RotationProtocol::new(&fx.recrypt, &fx.directory)
            .rotate_group_key(&fx.alice, &alice_sk, &mut fx.group)
            .unwrap_err();

        assert!(matches!(err, SdkError::Directory(_)));
        assert_eq!(fx.group, before);
    }

    #[test]
    fn group_two_degenerate_results_fail() {
        let mut fx = group_fixture();
        fx.recrypt.push_degenerate_rotation();
        fx.recrypt.push_degenerate_rotation();
        let before = fx.group.clone();
        let alice_sk = private_key_of(&fx.alice);

        let err = RotationProtocol::new(&fx.recrypt, &fx.directory)
            .rotate_group_key(&fx.alice, &alice_sk, &mut fx.group)
            .unwrap_err();

        assert!(matches!(err, SdkError::RotationFailure(_)));
        assert_eq!(fx.group, before);
        assert_eq!(fx.directory.lookups.get(), 0);
    }
}
