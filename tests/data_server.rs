mod support;

use support::spawn_backend;

#[tokio::test]
async fn creates_and_retrieves_a_user() {
    let client = spawn_backend().await;
    let alice = client.insert_user("Alice").await.expect("insert user");
    let fetched = client.get_user(alice.user_id).await.expect("get user");
    assert_eq!(fetched, alice);
}

#[tokio::test]
async fn private_chat_between_two_users_is_idempotent() {
    let client = spawn_backend().await;
    let alice = client.insert_user("Alice").await.expect("insert alice");
    let bob = client.insert_user("Bob").await.expect("insert bob");

    let chat1 = client
        .insert_chat("ignored", vec![alice.user_id, bob.user_id])
        .await
        .expect("insert chat 1");
    let chat2 = client
        .insert_chat("ignored", vec![bob.user_id, alice.user_id])
        .await
        .expect("insert chat 2");
    assert_eq!(chat1.chat_id, chat2.chat_id);
    assert!(chat1.is_private);
}

#[tokio::test]
async fn three_party_chat_is_not_private_and_not_deduplicated() {
    let client = spawn_backend().await;
    let alice = client.insert_user("Alice").await.expect("insert alice");
    let bob = client.insert_user("Bob").await.expect("insert bob");
    let carol = client.insert_user("Carol").await.expect("insert carol");

    let user_ids = vec![alice.user_id, bob.user_id, carol.user_id];
    let chat1 = client.insert_chat("project", user_ids.clone()).await.expect("insert chat 1");
    let chat2 = client.insert_chat("project", user_ids).await.expect("insert chat 2");
    assert!(!chat1.is_private);
    assert_ne!(chat1.chat_id, chat2.chat_id);
}

#[tokio::test]
async fn messages_are_returned_in_insertion_order_with_authors() {
    let client = spawn_backend().await;
    let alice = client.insert_user("Alice").await.expect("insert alice");
    let bob = client.insert_user("Bob").await.expect("insert bob");
    let chat = client
        .insert_chat("ignored", vec![alice.user_id, bob.user_id])
        .await
        .expect("insert chat");

    client.insert_message(chat.chat_id, alice.user_id, "hi").await.expect("insert message 1");
    client.insert_message(chat.chat_id, bob.user_id, "hey").await.expect("insert message 2");

    let messages = client.get_messages(chat.chat_id).await.expect("get messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_text, "hi");
    assert_eq!(messages[0].user.user_id, alice.user_id);
    assert_eq!(messages[1].message_text, "hey");
    assert!(messages[0].message_ts <= messages[1].message_ts);
}

#[tokio::test]
async fn get_chats_sorts_newest_message_first() {
    let client = spawn_backend().await;
    let alice = client.insert_user("Alice").await.expect("insert alice");
    let bob = client.insert_user("Bob").await.expect("insert bob");
    let carol = client.insert_user("Carol").await.expect("insert carol");

    let with_bob = client
        .insert_chat("ignored", vec![alice.user_id, bob.user_id])
        .await
        .expect("chat with bob");
    let with_carol = client
        .insert_chat("group", vec![alice.user_id, carol.user_id, bob.user_id])
        .await
        .expect("chat with carol");

    client.insert_message(with_carol.chat_id, alice.user_id, "first").await.expect("message 1");
    client.insert_message(with_bob.chat_id, alice.user_id, "second").await.expect("message 2");

    let chats = client.get_chats(alice.user_id).await.expect("get chats");
    assert_eq!(chats[0].chat_id, with_bob.chat_id);
    assert_eq!(chats[1].chat_id, with_carol.chat_id);
}
