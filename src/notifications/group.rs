//! Display grouping, ordering and diffing of polled notifications.

use std::collections::HashSet;

use super::{AccountNotifications, Notification};
use crate::config::GroupBy;

/// Notifications of `current` whose id did not appear in the same
/// account's previous snapshot. Accounts absent from `previous` contribute
/// all of their notifications.
pub fn get_new_notifications(
    previous: &[AccountNotifications],
    current: &[AccountNotifications],
) -> Vec<Notification> {
    current
        .iter()
        .flat_map(|account| {
            let uuid = account.account.uuid();
            let seen: Option<HashSet<&str>> = previous
                .iter()
                .find(|p| p.account.uuid() == uuid)
                .map(|p| p.notifications.iter().map(|n| n.id.as_str()).collect());

            account
                .notifications
                .iter()
                .filter(move |n| match &seen {
                    Some(ids) => !ids.contains(n.id.as_str()),
                    None => true,
                })
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Group by repository full name in first-seen order. Notifications
/// without a repository are left out.
pub fn group_notifications_by_repository(
    notifications: &[Notification],
) -> Vec<(String, Vec<&Notification>)> {
    let mut groups: Vec<(String, Vec<&Notification>)> = Vec::new();
    for notification in notifications {
        let Some(name) = notification.repository_full_name() else {
            continue;
        };
        match groups.iter_mut().find(|(key, _)| key == name) {
            Some((_, members)) => members.push(notification),
            None => groups.push((name.to_string(), vec![notification])),
        }
    }
    groups
}

fn display_order(notifications: &[Notification], group_by: GroupBy) -> Vec<usize> {
    match group_by {
        GroupBy::Date => (0..notifications.len()).collect(),
        GroupBy::Repository => {
            let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
            for (i, notification) in notifications.iter().enumerate() {
                let Some(name) = notification.repository_full_name() else {
                    continue;
                };
                match groups.iter_mut().find(|(key, _)| *key == name) {
                    Some((_, members)) => members.push(i),
                    None => groups.push((name, vec![i])),
                }
            }
            groups.into_iter().flat_map(|(_, members)| members).collect()
        }
    }
}

/// Notifications in the order the list displays them.
pub fn flattened_notifications_by_repo(
    notifications: &[Notification],
    group_by: GroupBy,
) -> Vec<&Notification> {
    display_order(notifications, group_by)
        .into_iter()
        .map(|i| &notifications[i])
        .collect()
}

/// Assign every notification a global `order` index following the display
/// grouping, account by account.
///
/// With repository grouping, notifications without a repository are not
/// displayed in a group and are numbered after the grouped ones.
pub fn stabilize_notifications_order(accounts: &mut [AccountNotifications], group_by: GroupBy) {
    let mut next = 0;
    for account in accounts.iter_mut() {
        let ordered = display_order(&account.notifications, group_by);
        let mut assigned = vec![false; account.notifications.len()];

        for i in ordered {
            account.notifications[i].order = next;
            assigned[i] = true;
            next += 1;
        }
        for (notification, done) in account.notifications.iter_mut().zip(assigned) {
            if !done {
                notification.order = next;
                next += 1;
            }
        }
    }
}

pub fn notification_count(accounts: &[AccountNotifications]) -> usize {
    accounts.iter().map(|a| a.notifications.len()).sum()
}

pub fn unread_notification_count(accounts: &[AccountNotifications]) -> usize {
    accounts
        .iter()
        .map(|a| a.notifications.iter().filter(|n| n.unread).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::account::{Account, AccountUser, AuthMethod, Token};
    use crate::notifications::handlers::test_support::notification;

    fn in_repo(id: &str, full_name: &str) -> Notification {
        let mut n = notification("Issue", id);
        n.id = id.to_string();
        let repository = n.repository.as_mut().unwrap();
        repository.full_name = full_name.to_string();
        n
    }

    fn account_notifications(notifications: Vec<Notification>) -> AccountNotifications {
        let account = notifications
            .first()
            .map(|n| Arc::clone(&n.account))
            .unwrap_or_else(|| notification("Issue", "t").account);
        AccountNotifications {
            account,
            notifications,
            error: None,
        }
    }

    #[test]
    fn groups_in_first_seen_order() {
        let notifications = vec![
            in_repo("1", "a/one"),
            in_repo("2", "b/two"),
            in_repo("3", "a/one"),
        ];

        let groups = group_notifications_by_repository(&notifications);
        let summary: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|(name, members)| (name.as_str(), members.iter().map(|n| n.id.as_str()).collect()))
            .collect();
        assert_eq!(summary, vec![("a/one", vec!["1", "3"]), ("b/two", vec!["2"])]);
    }

    #[test]
    fn first_seen_order_is_not_alphabetical() {
        let notifications = vec![
            in_repo("1", "c/three"),
            in_repo("2", "a/one"),
            in_repo("3", "b/two"),
            in_repo("4", "a/one"),
        ];

        let keys: Vec<String> = group_notifications_by_repository(&notifications)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(keys, vec!["c/three", "a/one", "b/two"]);

        let flattened: Vec<&str> = flattened_notifications_by_repo(&notifications, GroupBy::Repository)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(flattened, vec!["1", "2", "4", "3"]);
    }

    #[test]
    fn flattening_follows_grouping() {
        let mut orphan = in_repo("4", "c/three");
        orphan.repository = None;
        let notifications = vec![
            in_repo("1", "a/one"),
            in_repo("2", "b/two"),
            in_repo("3", "a/one"),
            orphan,
        ];

        let by_repo: Vec<&str> = flattened_notifications_by_repo(&notifications, GroupBy::Repository)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(by_repo, vec!["1", "3", "2"]);

        let by_date: Vec<&str> = flattened_notifications_by_repo(&notifications, GroupBy::Date)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(by_date, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn order_is_global_across_accounts() {
        let mut accounts = vec![
            account_notifications(vec![in_repo("1", "a/one"), in_repo("2", "b/two"), in_repo("3", "a/one")]),
            account_notifications(vec![in_repo("4", "d/four")]),
        ];

        stabilize_notifications_order(&mut accounts, GroupBy::Repository);

        let orders: Vec<(String, usize)> = accounts
            .iter()
            .flat_map(|a| a.notifications.iter().map(|n| (n.id.clone(), n.order)))
            .collect();
        assert_eq!(
            orders,
            vec![
                ("1".to_string(), 0),
                ("2".to_string(), 2),
                ("3".to_string(), 1),
                ("4".to_string(), 3)
            ]
        );

        stabilize_notifications_order(&mut accounts, GroupBy::Date);
        assert_eq!(accounts[0].notifications[1].order, 1);
    }

    #[test]
    fn new_notifications_are_diffed_per_account() {
        let previous = vec![account_notifications(vec![in_repo("1", "a/one")])];
        let current = vec![account_notifications(vec![in_repo("1", "a/one"), in_repo("2", "a/one")])];

        let new: Vec<String> = get_new_notifications(&previous, &current)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(new, vec!["2".to_string()]);

        let mut other = Account::new("github.gitify.io", AuthMethod::PersonalAccessToken, Token::from_stored("t"));
        other.user = Some(AccountUser {
            id: "42".to_string(),
            login: "other".to_string(),
            name: None,
            avatar: None,
        });
        let mut unseen = in_repo("1", "a/one");
        unseen.account = Arc::new(other);
        let current = vec![account_notifications(vec![unseen])];
        assert_eq!(get_new_notifications(&previous, &current).len(), 1);
    }

    fn other_account() -> Arc<Account> {
        let mut other = Account::new("github.gitify.io", AuthMethod::PersonalAccessToken, Token::from_stored("t"));
        other.user = Some(AccountUser {
            id: "42".to_string(),
            login: "other".to_string(),
            name: None,
            avatar: None,
        });
        Arc::new(other)
    }

    #[test]
    fn removed_accounts_contribute_nothing() {
        let other = other_account();
        let mut gone = in_repo("9", "z/gone");
        gone.account = Arc::clone(&other);

        let previous = vec![
            account_notifications(vec![in_repo("1", "a/one"), in_repo("2", "a/one")]),
            account_notifications(vec![gone]),
        ];
        let current = vec![account_notifications(vec![
            in_repo("2", "a/one"),
            in_repo("3", "a/one"),
            in_repo("4", "b/two"),
        ])];

        let new: Vec<String> = get_new_notifications(&previous, &current)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(new, vec!["3".to_string(), "4".to_string()]);
    }

    #[test]
    fn counts() {
        let mut read = in_repo("2", "a/one");
        read.unread = false;
        let accounts = vec![account_notifications(vec![in_repo("1", "a/one"), read])];
        assert_eq!(notification_count(&accounts), 2);
        assert_eq!(unread_notification_count(&accounts), 1);
    }
}
