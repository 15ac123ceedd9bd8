use content_portal::models::{
    AddUserRequest, ChangePasswordRequest, CreatePostRequest, LoginRequest, PostStatus,
    ProfileUpdateRequest, RegisterRequest, Role, Timestamp, UpdatePostRequest, User,
    is_valid_url_tag,
};

fn valid_post() -> CreatePostRequest {
    CreatePostRequest {
        title: "Hello world".to_string(),
        description: "A long enough description".to_string(),
        url_tag: None,
        image_url: "https://res.cloudinary.com/demo/image/upload/a.png".to_string(),
    }
}

#[test]
fn test_user_deserializes_backend_shape() {
    let json = r#"{
        "id": "12",
        "name": "Lan",
        "email": "lan@example.com",
        "password": "secret1",
        "role": "admin",
        "isActive": false,
        "createDate": 1769040000
    }"#;
    let user: User = serde_json::from_str(json).unwrap();

    assert_eq!(user.role, Role::Admin);
    assert!(!user.is_active());
    assert_eq!(user.create_date, Some(Timestamp::Unix(1769040000)));
    assert_eq!(user.update_date, None);

    let redacted = serde_json::to_string(&user.redacted()).unwrap();
    assert!(!redacted.contains("secret1"));
}

#[test]
fn test_user_without_is_active_is_active() {
    let json = r#"{"id":"1","name":"A","email":"a@b.co","role":"user"}"#;
    let user: User = serde_json::from_str(json).unwrap();
    assert!(user.is_active());
}

#[test]
fn test_unknown_role_is_rejected() {
    let json = r#"{"id":"1","name":"A","email":"a@b.co","role":"owner"}"#;
    assert!(serde_json::from_str::<User>(json).is_err());
    assert!("owner".parse::<Role>().is_err());
    assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
}

#[test]
fn test_post_status_wire_format() {
    assert_eq!(serde_json::to_string(&PostStatus::Pending).unwrap(), "\"pending\"");
    assert_eq!(PostStatus::default(), PostStatus::Pending);
}

#[test]
fn test_login_requires_email_and_password() {
    let errors = LoginRequest::default().validate().unwrap_err();
    assert_eq!(errors.get("email"), Some("Email is required"));
    assert_eq!(errors.get("password"), Some("Password is required"));

    let short = LoginRequest {
        email: "a@b.co".to_string(),
        password: "12345".to_string(),
    };
    assert_eq!(
        short.validate().unwrap_err().get("password"),
        Some("Password must be at least 6 characters")
    );
}

#[test]
fn test_register_checks_confirmation_and_email() {
    let req = RegisterRequest {
        name: "Lan".to_string(),
        email: "not-an-email".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret2".to_string(),
    };
    let errors = req.validate().unwrap_err();
    assert_eq!(errors.get("email"), Some("Email is invalid"));
    assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    assert_eq!(errors.get("name"), None);
}

#[test]
fn test_register_rejects_single_letter_name() {
    let req = RegisterRequest {
        name: "L".to_string(),
        email: "lan@example.com".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
    };
    assert!(req.validate().unwrap_err().get("name").is_some());
}

#[test]
fn test_create_post_validation() {
    assert!(valid_post().validate().is_ok());

    let mut short = valid_post();
    short.title = "Hey".to_string();
    short.description = "short".to_string();
    let errors = short.validate().unwrap_err();
    assert_eq!(errors.get("title"), Some("Title must be at least 5 characters"));
    assert_eq!(
        errors.get("description"),
        Some("Description must be at least 10 characters")
    );

    let mut no_image = valid_post();
    no_image.image_url = String::new();
    assert!(no_image.validate().unwrap_err().get("imageUrl").is_some());
}

#[test]
fn test_url_tag_pattern() {
    assert!(is_valid_url_tag("my-new-post"));
    assert!(is_valid_url_tag("post2026"));
    assert!(!is_valid_url_tag("My-Post"));
    assert!(!is_valid_url_tag("double--dash"));
    assert!(!is_valid_url_tag("-leading"));

    let mut bad_tag = valid_post();
    bad_tag.url_tag = Some("Not A Slug".to_string());
    assert!(bad_tag.validate().unwrap_err().get("urlTag").is_some());

    // An empty tag means "derive it from the title".
    let mut empty_tag = valid_post();
    empty_tag.url_tag = Some(String::new());
    assert!(empty_tag.validate().is_ok());
}

#[test]
fn test_update_post_does_not_require_image() {
    let req = UpdatePostRequest {
        title: "Hello world".to_string(),
        description: "A long enough description".to_string(),
        url_tag: None,
        image_url: None,
    };
    assert!(req.validate().is_ok());
}

#[test]
fn test_profile_update_requires_name_and_valid_email() {
    let errors = ProfileUpdateRequest {
        name: Some("   ".to_string()),
        email: Some("bad".to_string()),
        avatar: None,
    }
    .validate()
    .unwrap_err();
    assert!(errors.get("name").is_some());
    assert_eq!(errors.get("email"), Some("Email is invalid"));
}

#[test]
fn test_change_password_validation() {
    let req = ChangePasswordRequest {
        current_password: String::new(),
        new_password: "abc".to_string(),
        confirm_password: "abd".to_string(),
    };
    let errors = req.validate().unwrap_err();
    assert!(errors.get("currentPassword").is_some());
    assert!(errors.get("newPassword").is_some());
    assert!(errors.get("confirmPassword").is_some());
}

#[test]
fn test_add_user_validation() {
    let req = AddUserRequest {
        name: "Editor".to_string(),
        email: "editor@example.com".to_string(),
        password: "secret1".to_string(),
        role: Role::Admin,
    };
    assert!(req.validate().is_ok());
}
