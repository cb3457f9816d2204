mod common;

#[cfg(test)]
mod tests {
    use crate::common::{public_for, signing_keys, MockDirectory, MockRecrypt};
    use docseal_core::{
        crypto::derive_document_key,
        keys::{
            member_transform_keys, AsymmetricReencryption, CapabilityError, DirectoryError, KeyEnvelope,
            PrincipalId, Recipient,
        },
        types::SdkError,
    };

    fn recipient(recrypt: &MockRecrypt, id: &str) -> (Recipient, docseal_core::keys::PrivateKey) {
        let pair = recrypt.generate_key_pair().unwrap();
        (
            Recipient { principal: PrincipalId::user(id), public_key: pair.public_key },
            pair.private_key,
        )
    }

    #[test]
    fn empty_recipient_list_does_not_touch_capability() {
        let recrypt = MockRecrypt::new();
        let envelope = KeyEnvelope::new(&recrypt);
        let opened = envelope.generate_document_key().unwrap();

        let sealed = envelope.seal_to_recipients(&opened.seed, &[], &signing_keys()).unwrap();
        assert!(sealed.is_empty());
        assert_eq!(recrypt.encrypt_calls.get(), 0);
    }

    #[test]
    fn every_recipient_opens_the_same_key() {
        let recrypt = MockRecrypt::new();
        let envelope = KeyEnvelope::new(&recrypt);
        let opened = envelope.generate_document_key().unwrap();

        let (alice, alice_sk) = recipient(&recrypt, "alice");
        let (bob, bob_sk) = recipient(&recrypt, "bob");
        let sealed = envelope
            .seal_to_recipients(&opened.seed, &[alice, bob], &signing_keys())
            .unwrap();

        assert_eq!(sealed.len(), 2);
        assert_eq!(sealed[0].principal, PrincipalId::user("alice"));
        assert_eq!(sealed[1].principal, PrincipalId::user("bob"));
        assert_eq!(recrypt.encrypt_calls.get(), 2);

        let by_alice = envelope.open_for(&sealed[0], &alice_sk).unwrap();
        let by_bob = envelope.open_for(&sealed[1], &bob_sk).unwrap();
        assert_eq!(by_alice.key, opened.key);
        assert_eq!(by_bob.key, opened.key);
    }

    #[test]
    fn document_key_is_derived_not_the_seed() {
        let recrypt = MockRecrypt::new();
        let opened = KeyEnvelope::new(&recrypt).generate_document_key().unwrap();

        assert_eq!(opened.key, derive_document_key(opened.seed.as_bytes()));
        assert_ne!(&opened.key.as_bytes()[..], &opened.seed.as_bytes()[..32]);
    }

    #[test]
    fn wrong_private_key_fails() {
        let recrypt = MockRecrypt::new();
        let envelope = KeyEnvelope::new(&recrypt);
        let opened = envelope.generate_document_key().unwrap();
        let (alice, _) = recipient(&recrypt, "alice");
        let (_, mallory_sk) = recipient(&recrypt, "mallory");

        let sealed = envelope.seal_to_recipients(&opened.seed, &[alice], &signing_keys()).unwrap();
        assert!(matches!(
            envelope.open_for(&sealed[0], &mallory_sk),
            Err(SdkError::Capability(CapabilityError::WrongKey))
        ));
    }

    #[test]
    fn reseal_hands_the_same_seed_to_new_recipients() {
        let recrypt = MockRecrypt::new();
        let envelope = KeyEnvelope::new(&recrypt);
        let opened = envelope.generate_document_key().unwrap();
        let (alice, alice_sk) = recipient(&recrypt, "alice");
        let (carol, carol_sk) = recipient(&recrypt, "carol");

        let own = envelope.seal_to_recipients(&opened.seed, &[alice], &signing_keys()).unwrap();
        let granted = envelope
            .reseal(&own[0], &alice_sk, &[carol], &signing_keys())
            .unwrap();

        assert_eq!(granted.len(), 1);
        assert_eq!(envelope.open_for(&granted[0], &carol_sk).unwrap().key, opened.key);
    }

    #[test]
    fn reseal_to_nobody_skips_decrypt() {
        let recrypt = MockRecrypt::new();
        let envelope = KeyEnvelope::new(&recrypt);
        let opened = envelope.generate_document_key().unwrap();
        let (alice, _) = recipient(&recrypt, "alice");
        let (_, stranger_sk) = recipient(&recrypt, "stranger");

        let own = envelope.seal_to_recipients(&opened.seed, &[alice], &signing_keys()).unwrap();
        // Would fail with WrongKey if it tried to open.
        assert!(envelope.reseal(&own[0], &stranger_sk, &[], &signing_keys()).unwrap().is_empty());
    }

    #[test]
    fn transform_keys_per_member() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let group = recrypt.generate_key_pair().unwrap();

        let mut expected = Vec::new();
        for id in ["m1", "m2"] {
            let pair = recrypt.generate_key_pair().unwrap();
            directory.publish(PrincipalId::user(id), public_for(&pair.private_key));
            expected.push(pair.public_key);
        }

        let members = vec!["m1".to_string(), "m2".to_string()];
        let keys = member_transform_keys(&recrypt, &directory, &group.private_key, &members, &signing_keys())
            .unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].member, PrincipalId::user("m1"));
        for (tk, public_key) in keys.iter().zip(&expected) {
            let direct = recrypt
                .generate_transform_key(&group.private_key, public_key, &signing_keys())
                .unwrap();
            assert_eq!(tk.transform_key, direct);
        }
    }

    #[test]
    fn transform_key_for_unknown_member_fails() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let group = recrypt.generate_key_pair().unwrap();

        let err = member_transform_keys(
            &recrypt,
            &directory,
            &group.private_key,
            &["ghost".to_string()],
            &signing_keys(),
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::Directory(DirectoryError::KeyNotFound(p)) if p.id == "ghost"));
    }

    #[test]
    fn no_members_no_lookup() {
        let recrypt = MockRecrypt::new();
        let directory = MockDirectory::new();
        let group = recrypt.generate_key_pair().unwrap();

        let keys = member_transform_keys(&recrypt, &directory, &group.private_key, &[], &signing_keys()).unwrap();
        assert!(keys.is_empty());
        assert_eq!(directory.lookups.get(), 0);
    }
}
